//! Prompt builder: renders one turn's state into a single instruction block.
//!
//! Providers are stateless across turns, so every prompt restates the full
//! position, history and legal-move list. Pure function of its inputs.

use arena_core::Side;

use crate::session::format_movetext;

/// What went wrong on the previous attempt of this ply. Present iff the
/// current attempt is a retry; its presence escalates the prompt's tone.
#[derive(Debug, Clone)]
pub enum RetryWarning {
    /// The named token was extracted but rejected as illegal.
    Rejected(String),
    /// No move could be parsed out of the reply at all.
    Unparsed,
    /// The provider call itself failed (process or transport error).
    ProviderError,
}

/// Inputs for one turn's prompt.
#[derive(Debug)]
pub struct TurnPrompt<'a> {
    pub side: Side,
    pub opponent: &'a str,
    pub fen: &'a str,
    pub move_number: u32,
    pub in_check: bool,
    pub legal_moves: &'a [String],
    pub history: &'a [String],
    pub warning: Option<&'a RetryWarning>,
}

/// Build the instruction block sent to the move provider.
pub fn build_prompt(turn: &TurnPrompt<'_>) -> String {
    let history = if turn.history.is_empty() {
        "(game start)".to_string()
    } else {
        format_movetext(turn.history)
    };

    let check_banner = if turn.in_check {
        "\n*** YOUR KING IS IN CHECK. You must resolve the check. ***\n"
    } else {
        ""
    };

    let warning_banner = match turn.warning {
        None => String::new(),
        Some(warning) => {
            let detail = match warning {
                RetryWarning::Rejected(token) => {
                    format!("Your previous move `{token}` was REJECTED: it is not a legal move.")
                }
                RetryWarning::Unparsed => {
                    "No move could be parsed from your previous reply.".to_string()
                }
                RetryWarning::ProviderError => {
                    "Your previous reply did not arrive.".to_string()
                }
            };
            format!(
                "\n*** {detail} This is your LAST chance: answer with one legal move \
                 from the list below in the exact format required, or you FORFEIT \
                 the game. ***\n"
            )
        }
    };

    format!(
        "You are playing chess as {side} against {opponent}. It is move {number}.\n\
         {warning_banner}{check_banner}\n\
         CURRENT POSITION (FEN): {fen}\n\n\
         MOVE HISTORY: {history}\n\n\
         LEGAL MOVES: {legal}\n\n\
         Your goal is to win. Think about piece development, king safety, pawn \
         structure, and tactical opportunities.\n\n\
         After your analysis, output your chosen move on its own line in EXACTLY \
         this format:\n\
         MOVE: <your move>\n\n\
         The move MUST be exactly one of the legal moves listed above, in Standard \
         Algebraic Notation (SAN). If you wish to give up instead, output:\n\
         MOVE: RESIGN",
        side = turn.side,
        opponent = turn.opponent,
        number = turn.move_number,
        fen = turn.fen,
        legal = turn.legal_moves.join(", "),
    )
}
