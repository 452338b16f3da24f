use std::time::Duration;

/// Configuration for the analysis backend used by the extraction gateway.
///
/// Constructed by the caller and passed into the gateway explicitly; there
/// is no process-wide model configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub metadata_model: String,
    pub text_model: String,
    pub table_model: String,
    pub image_model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Budget for one analysis call; implementations treat an elapsed
    /// budget as a failed analysis for that item.
    pub timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            metadata_model: "gemini-2.5-flash".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            table_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash".to_string(),
            temperature: 0.1,
            max_output_tokens: 65_536,
            timeout: Duration::from_secs(120),
        }
    }
}
