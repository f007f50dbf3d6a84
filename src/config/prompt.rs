use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use log::info;

/// Built-in persona and response rules for the maintenance assistant.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are IndustriSense AI, a factory maintenance assistant that helps with machine monitoring, maintenance planning, and troubleshooting.

CORE CAPABILITIES:
- Analyze machine health and readings
- Explain alerts and anomalies
- Recommend maintenance actions
- Help with troubleshooting
- Provide cost estimates
- Guide on using the system

RESPONSE RULES:
1. Keep responses concise and actionable
2. Use specific data when available (temperatures, dates, costs)
3. Provide clear next steps
4. Use bullet points for lists
5. NO markdown or HTML formatting - plain text only
6. Include machine IDs and specific metrics
7. End with actionable recommendations

QUERY CATEGORIES:
- Machine Health: Status, alerts, anomalies
- Maintenance: Schedules, overdue items, planning
- Troubleshooting: Temperature, vibration, pressure issues
- Reports: Costs, analytics, compliance
- Inventory: Parts stock, ordering
- Guidance: How-to questions, best practices

EXAMPLE RESPONSE FORMAT:
\"CNC-001 triggered a critical alert due to anomaly:
- Temperature: 95°C (normal: 65-75°C)
- Vibration: 8.5 (normal: 2-5)

Recommended actions:
1. Stop machine immediately
2. Check cooling system
3. Schedule emergency maintenance

Estimated repair cost: ₹50,000-₹75,000 if addressed now.\"

Always be helpful, specific, and action-oriented.";

#[derive(Debug)]
pub enum PromptError {
    IoError(String, std::io::Error),
    Empty(String),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::IoError(path, e) =>
                write!(f, "Failed to read system instruction file '{}': {}", path, e),
            PromptError::Empty(path) => write!(f, "System instruction file '{}' is empty", path),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(_, e) => Some(e),
            PromptError::Empty(_) => None,
        }
    }
}

/// Resolves the system instruction once at start-up. An override file, when
/// given, replaces the built-in text entirely.
pub fn load_system_instruction<P: AsRef<Path>>(path: Option<P>) -> Result<Arc<str>, PromptError> {
    let Some(path) = path else {
        return Ok(Arc::from(DEFAULT_SYSTEM_INSTRUCTION));
    };
    let display = path.as_ref().display().to_string();
    let content = fs
        ::read_to_string(&path)
        .map_err(|e| PromptError::IoError(display.clone(), e))?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PromptError::Empty(display));
    }
    info!("Loaded system instruction from '{}' ({} bytes)", display, trimmed.len());
    Ok(Arc::from(trimmed))
}
