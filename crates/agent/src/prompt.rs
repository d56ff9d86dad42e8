//! Qualification prompt assets.
//!
//! The rubric is versioned: any change to the wording that could move a
//! lead between tiers bumps `PROMPT_VERSION`.

pub const PROMPT_VERSION: &str = "lead-qualifier/v1";

pub const SYSTEM_PERSONA: &str = "You are LumiNova AI, an expert sales lead qualifier.";

pub const TASK_FRAMING: &str = "You are an expert Sales Lead Qualifier AI named LumiNova AI.
Your task is to analyze a company's description and determine its qualification status and priority for sales outreach.
The client you are qualifying leads for is a **leading provider of cloud infrastructure and advanced AI solutions for enterprises**.";

pub const QUALIFICATION_RUBRIC: &str = "1.  **Qualified Status**: (Choose from 'High Fit', 'Medium Fit', 'Low Fit', 'Not Fit').
    * 'High Fit': Clearly a B2B company that explicitly mentions tech, cloud, AI, data, software development, or large-scale operations.
    * 'Medium Fit': B2B, but vague or indirect alignment. Might use cloud/AI but not a core focus.
    * 'Low Fit': B2B but seems unlikely to need advanced cloud/AI solutions.
    * 'Not Fit': Primarily B2C, retail, small local service, or completely irrelevant to enterprise cloud/AI.
2.  **Priority Score**: (A number from 1 to 5, where 5 is highest priority for immediate sales outreach. 0 for 'Not Fit').
    * 'High Fit' -> 4-5
    * 'Medium Fit' -> 3
    * 'Low Fit' -> 1-2
    * 'Not Fit' -> 0
3.  **Reasoning**: (A brief, concise, 2-3 sentence explanation for why you assigned that status and score. Focus on specific keywords or phrases from the description that indicate alignment or non-alignment with cloud/AI solutions.)";

pub const OUTPUT_CONTRACT: &str = r#"Format your response strictly as a JSON object with exactly these keys. Ensure 'priority_score' is an integer.
{
  "qualified_status": "...",
  "priority_score": int,
  "reasoning": "..."
}"#;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub version: &'static str,
    pub system_persona: &'static str,
    pub text: String,
}

#[derive(Clone, Debug, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Renders the user prompt for one lead. Lead text is inserted once,
    /// as-is; braces or rubric-like phrases inside it are not interpreted.
    pub fn render(&self, company_name: &str, description: &str) -> RenderedPrompt {
        let text = format!(
            "{TASK_FRAMING}\n\n\
             Analyze the following sales lead:\n\
             Company Name: {company_name}\n\
             Company Description: {description}\n\n\
             Based on this, provide:\n\
             {QUALIFICATION_RUBRIC}\n\n\
             {OUTPUT_CONTRACT}\n"
        );

        RenderedPrompt { version: PROMPT_VERSION, system_persona: SYSTEM_PERSONA, text }
    }
}
