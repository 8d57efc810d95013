//! Adverse-reaction extraction on top of any [`TextGenerator`].
//!
//! The model is asked for a comma-separated list of side effects of one drug
//! found in a social-media post, or a lone `X` when the post reports none.

use crate::{client::TextGenerator, errors::BridgeError};

const NO_SIDE_EFFECTS: &str = "X";

pub fn side_effect_prompt(drug: &str, post_text: &str) -> String {
    format!(
        "You are a pharmacovigilance specialist analyzing side effects of {drug} reported in social media posts.\n\
         Answer in English with the side effects if there are any, or X if there are none.\n\
         Understand informal language in any language. Do not confuse side effects with the symptoms {drug} treats \
         or with withdrawal symptoms after stopping it.\n\
         Do not assume side effects; extract them from the post.\n\
         Do not explain or comment. The answer must be either a single X or a list of side effect names with no \
         additional detail.\n\
         If the post only talks about {drug} and the symptoms of the condition it treats, answer X.\n\
         Only list side effects caused by {drug} that are bad or undesirable, physical or emotional.\n\
         Separate multiple side effects with a single comma and no whitespace.\n\
         Post: {post_text}"
    )
}

/// Parses a model answer into side effects.
///
/// `None` means the model reported nothing (a lone `X` or an empty answer).
pub fn parse_side_effects(answer: &str) -> Option<Vec<String>> {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case(NO_SIDE_EFFECTS) {
        return None;
    }

    let mut effects: Vec<String> = Vec::new();
    for item in answer.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !effects.iter().any(|seen| seen == item) {
            effects.push(item.to_string());
        }
    }

    if effects.is_empty() {
        None
    } else {
        Some(effects)
    }
}

pub async fn detect_side_effects<G>(
    generator: &G,
    drug: &str,
    post_text: &str,
) -> Result<Option<Vec<String>>, BridgeError>
where
    G: TextGenerator + ?Sized,
{
    let prompt = side_effect_prompt(drug, post_text);
    let answer = generator.generate(&prompt).await?;
    Ok(parse_side_effects(&answer))
}
