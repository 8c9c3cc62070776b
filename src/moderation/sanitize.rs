use regex::Captures;

use super::rules::{BlockedTerm, is_line_terminator};

const MAX_REPEAT: usize = 3;
const SHOUTING_RUN: usize = 5;

pub(super) fn sanitize(text: &str, terms: &[BlockedTerm], mask: char) -> String {
    let mut sanitized = mask_blocked_terms(text, terms, mask);

    // Softening a shouted run can line up identical characters again
    // ("BCAAAaaa"), so iterate until stable.
    loop {
        let next = soften_shouting(&collapse_repeats(&sanitized, mask));
        if next == sanitized {
            break;
        }
        sanitized = next;
    }

    sanitized.trim().to_owned()
}

fn mask_blocked_terms(text: &str, terms: &[BlockedTerm], mask: char) -> String {
    let mut masked = text.to_owned();
    for term in terms {
        masked = term
            .regex()
            .replace_all(&masked, |captures: &Captures| {
                std::iter::repeat_n(mask, captures[0].chars().count()).collect::<String>()
            })
            .into_owned();
    }
    masked
}

/// Runs of four or more identical characters shrink to three. Mask runs keep
/// their length.
fn collapse_repeats(text: &str, mask: char) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    let mut run_len = 0;

    for character in text.chars() {
        if Some(character) == previous {
            run_len += 1;
        } else {
            previous = Some(character);
            run_len = 1;
        }

        if run_len <= MAX_REPEAT || character == mask || is_line_terminator(character) {
            collapsed.push(character);
        }
    }

    collapsed
}

fn soften_shouting(text: &str) -> String {
    let mut softened = String::with_capacity(text.len());
    let mut run = String::new();

    for character in text.chars() {
        if character.is_ascii_uppercase() {
            run.push(character);
            continue;
        }
        flush_shouting_run(&mut softened, &mut run);
        softened.push(character);
    }
    flush_shouting_run(&mut softened, &mut run);

    softened
}

fn flush_shouting_run(out: &mut String, run: &mut String) {
    if run.len() >= SHOUTING_RUN {
        let mut characters = run.chars();
        if let Some(first) = characters.next() {
            out.push(first);
            out.extend(characters.map(|character| character.to_ascii_lowercase()));
        }
    } else {
        out.push_str(run);
    }
    run.clear();
}
