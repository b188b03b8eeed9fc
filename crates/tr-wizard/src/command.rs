use tr_core::core::AnnotationWizard;

/// One line of reviewer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `r <criterion#> <value>`, criterion numbers are 1-based as displayed.
    Rate { criterion: usize, value: u8 },
    Comment(String),
    Next,
    Back,
    Skip,
    Unskip,
    Help,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            "r" | "rate" => {
                let mut parts = rest.split_whitespace();
                let (Some(criterion), Some(value), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err("usage: r <criterion#> <value>".to_owned());
                };
                let criterion = criterion
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("not a criterion number: {criterion}"))?;
                let value = value
                    .parse::<u8>()
                    .map_err(|_| format!("not a rating value: {value}"))?;
                Ok(Self::Rate { criterion, value })
            }
            "c" | "comment" => Ok(Self::Comment(rest.to_owned())),
            "n" | "next" => Ok(Self::Next),
            "b" | "back" => Ok(Self::Back),
            "s" | "skip" => Ok(Self::Skip),
            "u" | "unskip" => Ok(Self::Unskip),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "" => Err("type h for help".to_owned()),
            other => Err(format!("unknown command: {other} (type h for help)")),
        }
    }
}

/// The command that reopens the submit confirmation after a failed submission.
///
/// A skipped single-unit conversation is submitted through skip; its ratings
/// may be incomplete, so next would be blocked.
pub fn resubmit_command(wizard: &AnnotationWizard) -> Command {
    if wizard.is_single_unit() && wizard.active_skipped() {
        Command::Skip
    } else {
        Command::Next
    }
}

impl Command {
    /// The shortest input that parses to this command.
    pub fn shortcut(&self) -> &'static str {
        match self {
            Self::Rate { .. } => "r",
            Self::Comment(_) => "c",
            Self::Next => "n",
            Self::Back => "b",
            Self::Skip => "s",
            Self::Unskip => "u",
            Self::Help => "h",
            Self::Quit => "q",
        }
    }
}
