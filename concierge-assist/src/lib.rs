pub mod alternatives;
pub mod codes;
pub mod dates;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod rules;
pub mod summary;

pub use alternatives::mock_alternatives;
pub use codes::{extract_confirmation_code, extract_stated_code, generate_confirmation_code};
pub use dates::parse_date_phrase;
pub use intent::{AssistAction, Intent, IntentResult};
pub use knowledge::{airport_guide, knowledge_context, voice_agent_prompt};
pub use llm::{IntentRequest, IntentService};
pub use summary::{ChangeSummary, TripSummary};
