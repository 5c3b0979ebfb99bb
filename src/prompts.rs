pub const ANALYSIS_SYSTEM: &str = include_str!("../data/prompts/analysis_system.txt");
pub const ANALYSIS_USER: &str = include_str!("../data/prompts/analysis_user.txt");

pub const ENGLISH_FIELD_DESCRIPTION: &str = "The detailed image generation prompt in English.";
pub const ARABIC_FIELD_DESCRIPTION: &str = "The detailed image generation prompt in Arabic.";
