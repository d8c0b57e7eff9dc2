use crate::analysis::token::Token;

/// One stage of an analyzer. Stages rewrite the token stream in place and
/// may drop, split or flag tokens.
pub trait TokenFilter: Send + Sync {
    fn apply(&self, tokens: &mut Vec<Token>);

    fn name(&self) -> &'static str;
}
