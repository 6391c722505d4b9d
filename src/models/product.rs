use serde::{Deserialize, Serialize};

/// Product as listed by the catalog service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub count_in_stock: Option<i64>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.count_in_stock.map_or(true, |count| count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_shape() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "name": "Mouse",
            "price": 45000,
            "countInStock": 0
        }))
        .unwrap();
        assert_eq!(product.id, "p1");
        assert!(!product.in_stock());
    }
}
