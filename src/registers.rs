use serde::Deserialize;

/// One entry of the operator supplied register catalogue.
///
/// The catalogue order defines the order of the registers in the response
/// block. Entries marked `skip` still occupy their slot in the block but
/// are dropped from the decoded output; the controller reports some
/// quantities as register pairs of which only one word is meaningful.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Device specific register number, kept as the vendor documentation
    /// writes it (e.g. "12358").
    pub address: String,
    pub description: String,
    /// Positive divisor applied to the raw signed register value.
    pub scale: f64,
    pub unit: String,
    #[serde(default)]
    pub skip: bool,
}

impl RegisterRequest {
    pub fn new(address: &str, description: &str, scale: f64, unit: &str) -> Self {
        assert!(scale > 0.0, "register scale must be positive");
        Self {
            address: address.into(),
            description: description.into(),
            scale,
            unit: unit.into(),
            skip: false,
        }
    }

    /// Mark this register as occupying a slot in the response without
    /// producing a measurement.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

/// A decoded, scaled reading for one register.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub description: String,
    pub value: f64,
    pub unit: String,
}
