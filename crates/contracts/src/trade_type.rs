use serde::{Deserialize, Serialize};

/// Trade type. Each has its own workflow and reminder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeType {
    /// Direct buyer/seller trade.
    #[serde(rename = "Normal Trade")]
    Normal,
    /// Trade against Cotton Corporation of India lots: quality passing and EMD apply.
    #[serde(rename = "CCI Trade")]
    Cci,
}

impl TradeType {
    pub const ALL: [TradeType; 2] = [TradeType::Normal, TradeType::Cci];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Normal => "Normal Trade",
            TradeType::Cci => "CCI Trade",
        }
    }
}

impl core::fmt::Display for TradeType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_display_name() {
        assert_eq!(serde_json::to_string(&TradeType::Cci).unwrap(), "\"CCI Trade\"");
        let parsed: TradeType = serde_json::from_str("\"Normal Trade\"").unwrap();
        assert_eq!(parsed, TradeType::Normal);
    }
}
