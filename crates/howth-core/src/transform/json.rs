use async_trait::async_trait;
use howth_graph::{Artifact, ConfigHash, Dialect};

use super::{TransformError, TransformRequest, Transformer};

/// Emits a JSON file as an ES module with the parsed value as its default
/// export.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransformer;

#[async_trait]
impl Transformer for JsonTransformer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn fingerprint(&self) -> ConfigHash {
        ConfigHash::builder().field("json/v1").finish()
    }

    fn supports(&self, dialect: Dialect) -> bool {
        dialect == Dialect::Data
    }

    async fn transform(&self, request: &TransformRequest) -> Result<Artifact, TransformError> {
        let value: serde_json::Value = serde_json::from_str(&request.source)
            .map_err(|e| TransformError::new(&request.path, e.to_string()))?;
        let code = format!("export default {value};\n");
        Ok(Artifact::new(code, Vec::new(), request.source_type))
    }
}
