//! Helpers of the interactive prompt.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Example queries shown when the CLI starts.
pub const EXAMPLES: &str = "\
Example queries:
  - write me test cases based on 145322 tp user story
  - add a comment to 145155 card saying \"test\"
  - write detailed test cases based on 145640 user story and add them as a comment
  - get 145637 user story and create a bug based on this story where Add Tile flyout (for a Static Tile) not show

Example commands:
  - tp 145322   write test cases for user story 145322 and add them as a comment
  - bug 145322  write test cases for bug 145322 and add them as a comment
  - quit        leave the session";

/// Returns the intro text naming the model in use.
pub fn banner(model: &str) -> String {
    let rule = "=".repeat(70);
    format!(
        "{rule}\n\
         Ticket agent: chat with a local model that works on tracker cards.\n\
         Ask a question or give a command to get started.\n\
         \n\
         Model: {model}\n\
         {rule}"
    )
}

/// Returns `true` if the input asks to leave the session.
pub fn is_quit(input: &str) -> bool {
    ["quit", "exit", "q"]
        .iter()
        .any(|word| input.trim().eq_ignore_ascii_case(word))
}

/// Expands the `tp <id>` and `bug <id>` shortcuts into a full request.
///
/// Returns `None` if the input is not a shortcut.
pub fn expand_shortcut(input: &str) -> Option<String> {
    let mut words = input.split_whitespace();
    let (Some(command), Some(id), None) = (words.next(), words.next(), words.next())
    else {
        return None;
    };
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let content = if command.eq_ignore_ascii_case("tp") {
        "user story"
    } else if command.eq_ignore_ascii_case("bug") {
        "bug"
    } else {
        return None;
    };
    Some(format!(
        "write detailed test cases based on {id} {content} content, format \
         them inside html <div> element and add them as a comment"
    ))
}

/// Reads the next line of input, `None` at end of input or on a read error.
///
/// The reader must live across calls, buffered input is lost otherwise.
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {err}");
            None
        }
    }
}
