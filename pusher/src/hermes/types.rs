use serde::Deserialize;

/// Response of `GET /v2/updates/price/latest`.
#[derive(Debug, Deserialize)]
pub struct LatestUpdateEnvelope {
    pub binary: BinaryUpdate,

    #[serde(default)]
    pub parsed: Vec<ParsedPriceUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct BinaryUpdate {
    pub encoding: String,
    pub data: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParsedPriceUpdate {
    /// Hex without `0x`.
    pub id: String,
    pub price: RpcPrice,
    pub ema_price: RpcPrice,
}

/// Integer fields arrive as decimal strings.
#[derive(Debug, Deserialize)]
pub struct RpcPrice {
    pub price: String,
    pub conf: String,
    pub expo: i32,
    pub publish_time: i64,
}
