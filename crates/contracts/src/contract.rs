use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tradedesk_core::{ContractId, DomainError, DomainResult};

use crate::state::ContractLifecycleState;
use crate::trade_type::TradeType;

/// Buyer or seller as captured on the contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    pub name: String,
}

impl Party {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Agreed cotton quality parameters. Unset parameters are absent from the
/// rule-visible document, so a rule on them resolves as unresolvable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySpecs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staple_length_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micronaire: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_gpt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture_percent: Option<f64>,
}

/// Immutable snapshot of a trade contract, supplied by contract management.
///
/// Rule conditions address fields by their camelCase names with dot paths
/// (`quantityBales`, `buyer.name`, `qualitySpecs.micronaire`). Fields the
/// engine does not model can ride along in `attributes`; they are flattened
/// into the same namespace but never shadow a typed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSnapshot {
    pub id: ContractId,
    pub status: ContractLifecycleState,
    pub trade_type: TradeType,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub vendor_id: String,
    #[serde(default)]
    pub buyer: Party,
    #[serde(default)]
    pub seller: Party,
    pub quantity_bales: u64,
    /// Rate per candy in the smallest currency unit.
    pub rate: u64,
    #[serde(default)]
    pub bargain_type: String,
    #[serde(default)]
    pub quality_specs: QualitySpecs,
    /// Earnest money deposit received.
    #[serde(default)]
    pub emd_paid: bool,
    #[serde(default, flatten)]
    pub attributes: BTreeMap<String, JsonValue>,
}

/// Top-level names the typed fields occupy in the rule-visible document.
pub const TYPED_FIELD_NAMES: &[&str] = &[
    "id",
    "status",
    "tradeType",
    "clientId",
    "vendorId",
    "buyer",
    "seller",
    "quantityBales",
    "rate",
    "bargainType",
    "qualitySpecs",
    "emdPaid",
];

impl ContractSnapshot {
    /// A draft with no parties, quantity or rate yet.
    pub fn draft(id: ContractId, trade_type: TradeType) -> Self {
        Self {
            id,
            status: ContractLifecycleState::Draft,
            trade_type,
            client_id: String::new(),
            vendor_id: String::new(),
            buyer: Party::default(),
            seller: Party::default(),
            quantity_bales: 0,
            rate: 0,
            bargain_type: String::new(),
            quality_specs: QualitySpecs::default(),
            emd_paid: false,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: ContractLifecycleState) -> Self {
        self.status = status;
        self
    }

    /// Sets both the party ids used by validation rules and the display parties.
    pub fn with_parties(mut self, buyer: Party, seller: Party) -> Self {
        self.client_id = buyer.id.clone();
        self.vendor_id = seller.id.clone();
        self.buyer = buyer;
        self.seller = seller;
        self
    }

    pub fn with_quantity(mut self, quantity_bales: u64) -> Self {
        self.quantity_bales = quantity_bales;
        self
    }

    pub fn with_rate(mut self, rate: u64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_bargain_type(mut self, bargain_type: impl Into<String>) -> Self {
        self.bargain_type = bargain_type.into();
        self
    }

    pub fn with_quality_specs(mut self, specs: QualitySpecs) -> Self {
        self.quality_specs = specs;
        self
    }

    pub fn with_emd_paid(mut self, emd_paid: bool) -> Self {
        self.emd_paid = emd_paid;
        self
    }

    /// Attach an extra rule-visible value. Keys naming a typed field are refused.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: JsonValue,
    ) -> DomainResult<Self> {
        let key = key.into();
        if TYPED_FIELD_NAMES.contains(&key.as_str()) {
            return Err(DomainError::validation(format!(
                "attribute {key} collides with a contract field"
            )));
        }
        self.attributes.insert(key, value);
        Ok(self)
    }

    /// The document rule conditions are resolved against.
    ///
    /// Typed fields always win: an attribute whose key names a typed field
    /// (possible only by writing `attributes` directly) is left out.
    pub fn rule_document(&self) -> serde_json::Result<JsonValue> {
        let typed = Self {
            attributes: BTreeMap::new(),
            ..self.clone()
        };
        let mut doc = serde_json::to_value(typed)?;
        if let JsonValue::Object(fields) = &mut doc {
            for (key, value) in &self.attributes {
                fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_rule_visible_field_names() {
        let contract = ContractSnapshot::draft(ContractId::new("TC-1"), TradeType::Normal)
            .with_parties(
                Party::new("B-1", "Mahalaxmi Spinners"),
                Party::new("S-9", "Rajkot Ginning"),
            )
            .with_quantity(50)
            .with_quality_specs(QualitySpecs {
                micronaire: Some(4.2),
                ..QualitySpecs::default()
            })
            .with_attribute("station", json!("Rajkot"))
            .unwrap();

        let doc = contract.rule_document().unwrap();
        assert_eq!(doc["quantityBales"], json!(50));
        assert_eq!(doc["clientId"], json!("B-1"));
        assert_eq!(doc["buyer"]["name"], json!("Mahalaxmi Spinners"));
        assert_eq!(doc["qualitySpecs"]["micronaire"], json!(4.2));
        assert!(doc["qualitySpecs"].get("trashPercent").is_none());
        assert_eq!(doc["station"], json!("Rajkot"));
        assert_eq!(doc["tradeType"], json!("Normal Trade"));
        assert_eq!(doc["status"], json!("DRAFT"));
    }

    #[test]
    fn attributes_cannot_shadow_typed_fields() {
        let contract = ContractSnapshot::draft(ContractId::new("TC-2"), TradeType::Normal)
            .with_quantity(1500);
        for key in ["quantityBales", "clientId", "emdPaid", "tradeType"] {
            assert!(contract.clone().with_attribute(key, json!(10)).is_err());
        }

        let mut forced = contract.clone();
        forced.attributes.insert("quantityBales".into(), json!(10));
        forced.attributes.insert("station".into(), json!("Akola"));
        let doc = forced.rule_document().unwrap();
        assert_eq!(doc["quantityBales"], json!(1500));
        assert_eq!(doc["station"], json!("Akola"));
    }

    #[test]
    fn deserialized_typed_keys_never_land_in_attributes() {
        let json = json!({
            "id": "TC-3",
            "status": "DRAFT",
            "tradeType": "Normal Trade",
            "quantityBales": 1500,
            "rate": 6000,
            "station": "Akola"
        });
        let contract: ContractSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(contract.quantity_bales, 1500);
        assert_eq!(contract.attributes.len(), 1);
        assert_eq!(contract.attributes["station"], json!("Akola"));
    }
}
