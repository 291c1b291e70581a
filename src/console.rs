use std::io::{self, BufRead, Write};

/// Ask a yes/no question. Only an explicit `y` (any case) counts as yes;
/// everything else, including `yes`, is a refusal.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    confirm_from(io::stdin().lock(), prompt)
}

fn confirm_from<R: BufRead>(mut input: R, prompt: &str) -> io::Result<bool> {
    let answer = ask(&mut input, prompt)?;
    Ok(answer.eq_ignore_ascii_case("y"))
}

/// Prompt for a free-form line, returned trimmed.
pub fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut input = io::stdin().lock();
    ask(&mut input, prompt)
}

/// Prompt for a 1-based pick out of `len` entries. Returns the zero-based
/// index, or `None` when the reply is not a number in range.
pub fn choose_index(prompt: &str, len: usize) -> io::Result<Option<usize>> {
    choose_index_from(io::stdin().lock(), prompt, len)
}

fn choose_index_from<R: BufRead>(mut input: R, prompt: &str, len: usize) -> io::Result<Option<usize>> {
    let answer = ask(&mut input, prompt)?;
    Ok(answer
        .parse::<usize>()
        .ok()
        .filter(|pick| (1..=len).contains(pick))
        .map(|pick| pick - 1))
}

fn ask<R: BufRead>(input: &mut R, prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn only_a_bare_y_confirms() {
        for yes in ["y\n", "Y\n", "  y  \n"] {
            assert!(confirm_from(Cursor::new(yes), "go? ").unwrap());
        }
        for no in ["n\n", "yes\n", "\n", "yy\n"] {
            assert!(!confirm_from(Cursor::new(no), "go? ").unwrap());
        }
    }

    #[test]
    fn selection_is_one_based_and_bounded() {
        assert_eq!(
            choose_index_from(Cursor::new("1\n"), "pick: ", 3).unwrap(),
            Some(0)
        );
        assert_eq!(
            choose_index_from(Cursor::new("3\n"), "pick: ", 3).unwrap(),
            Some(2)
        );
        assert_eq!(choose_index_from(Cursor::new("0\n"), "pick: ", 3).unwrap(), None);
        assert_eq!(choose_index_from(Cursor::new("4\n"), "pick: ", 3).unwrap(), None);
        assert_eq!(
            choose_index_from(Cursor::new("second\n"), "pick: ", 3).unwrap(),
            None
        );
    }
}
