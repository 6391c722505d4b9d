//! Property-based tests for checkout invariants.
//!
//! These tests use proptest to check validation, pricing and signing across a
//! wide range of inputs.

use proptest::prelude::*;
use storefront_checkout::{
    errors::ValidationFailure,
    models::{
        payment::amount_in_cents,
        shipping::{digits_only, international_phone},
        CartTotals, PricingRules, ShippingInfo,
    },
    services::{
        signature::IntegritySigner,
        validation::{missing_required_fields, validate_checkout, validate_phone},
    },
};

const REQUIRED: [&str; 7] = ["name", "email", "address", "city", "state", "phone", "legalId"];

fn valid_form() -> ShippingInfo {
    ShippingInfo {
        name: "Ana Pérez".into(),
        email: "ana@example.com".into(),
        address: "Calle 1 # 2-3".into(),
        city: "Bogotá".into(),
        state: "Cundinamarca".into(),
        phone: "3005551234".into(),
        legal_id: "1020304050".into(),
        ..Default::default()
    }
}

fn blank(form: &mut ShippingInfo, field: &str) {
    let target = match field {
        "name" => &mut form.name,
        "email" => &mut form.email,
        "address" => &mut form.address,
        "city" => &mut form.city,
        "state" => &mut form.state,
        "phone" => &mut form.phone,
        _ => &mut form.legal_id,
    };
    *target = "  ".to_string();
}

fn separator_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just(" "), Just("-"), Just("("), Just(")"), Just(".")], 0..6)
        .prop_map(|parts| parts.concat())
}

// Property: phone validity depends only on the digits
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn separators_do_not_change_phone_validity(
        digits in "[0-9]{4,14}",
        separators in separator_strategy(),
        split in 0usize..14,
    ) {
        let at = split.min(digits.len());
        let decorated = format!("{}{}{}", &digits[..at], separators, &digits[at..]);
        prop_assert_eq!(
            validate_phone(&decorated).is_ok(),
            validate_phone(&digits).is_ok()
        );
        prop_assert_eq!(validate_phone(&digits).is_ok(), digits.len() >= 10);
    }

    #[test]
    fn international_phone_is_digits_with_prefix(phone in "[0-9 ()+-]{0,20}") {
        let normalized = international_phone(&phone, "57");
        prop_assert!(normalized.starts_with("57"));
        prop_assert!(normalized.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(normalized.ends_with(&digits_only(&phone)));
    }
}

// Property: missing-field reporting names exactly the blank fields, in form order
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn missing_fields_are_exactly_the_blank_ones(mask in prop::collection::vec(any::<bool>(), 7)) {
        let mut form = valid_form();
        let expected: Vec<&str> = REQUIRED
            .iter()
            .zip(&mask)
            .filter(|(_, blanked)| **blanked)
            .map(|(field, _)| *field)
            .collect();
        for field in &expected {
            blank(&mut form, field);
        }

        prop_assert_eq!(missing_required_fields(&form), expected.clone());

        let result = validate_checkout(&form, Some("acc_tok"), true);
        if expected.is_empty() {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(ValidationFailure::MissingFields(expected)));
        }
    }
}

// Property: pricing
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn shipping_is_free_only_above_threshold(subtotal in 0i64..1_000_000) {
        let rules = PricingRules::default();
        let totals = CartTotals::from_subtotal(subtotal, &rules);
        prop_assert_eq!(totals.shipping == 0, subtotal > rules.free_shipping_threshold);
        prop_assert_eq!(totals.total, totals.subtotal + totals.shipping);
    }

    #[test]
    fn cents_are_total_times_hundred(total in 0i64..10_000_000_000) {
        prop_assert_eq!(amount_in_cents(total), Some(total * 100));
    }
}

// Property: signatures are deterministic and sensitive to every input
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn signing_is_deterministic(
        reference in "ORD-[a-f0-9]{24}-[0-9]{13}",
        amount in 0i64..10_000_000_000,
    ) {
        let signer = IntegritySigner::new("test_integrity_secret").unwrap();
        prop_assert_eq!(
            signer.sign(&reference, amount, "COP"),
            signer.sign(&reference, amount, "COP")
        );
    }

    #[test]
    fn adjacent_amounts_sign_differently(
        reference in "ORD-[a-f0-9]{24}-[0-9]{13}",
        amount in 0i64..10_000_000_000,
    ) {
        let signer = IntegritySigner::new("test_integrity_secret").unwrap();
        prop_assert_ne!(
            signer.sign(&reference, amount, "COP"),
            signer.sign(&reference, amount + 1, "COP")
        );
    }

    #[test]
    fn secret_changes_signature(reference in "ORD-[a-z0-9]{6}-[0-9]{13}", amount in 1i64..1_000_000) {
        let a = IntegritySigner::new("secret_a").unwrap();
        let b = IntegritySigner::new("secret_b").unwrap();
        prop_assert_ne!(a.sign(&reference, amount, "COP"), b.sign(&reference, amount, "COP"));
    }
}
