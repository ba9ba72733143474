//! REPL input parsing

/// A parsed REPL line
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Find the service closest to a point; `None` means ask for the point
    Nearest(Option<(f64, f64)>),
    /// Broadcast a position update to all geo services
    Update,
    /// List registered services
    Services,
    /// Show broker counters
    Stats,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one trimmed input line
    pub fn parse(input: &str) -> Result<Self, String> {
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match cmd.to_lowercase().as_str() {
            "1" | "nearest" | "n" => {
                if rest.is_empty() {
                    Ok(ReplCommand::Nearest(None))
                } else {
                    parse_point(rest).map(|p| ReplCommand::Nearest(Some(p)))
                }
            }
            "2" | "update" | "u" => Ok(ReplCommand::Update),
            "3" | "services" | "s" => Ok(ReplCommand::Services),
            "stats" => Ok(ReplCommand::Stats),
            "help" | "h" | "?" => Ok(ReplCommand::Help),
            "quit" | "q" | "exit" => Ok(ReplCommand::Quit),
            _ => Err(format!("Unknown command: {}", cmd)),
        }
    }
}

/// Parse "X,Y" into a point; whitespace around either value is allowed
pub fn parse_point(input: &str) -> Result<(f64, f64), String> {
    let values: Vec<&str> = input.split(',').map(str::trim).collect();
    if values.len() != 2 {
        return Err(format!("2 values expected, got {}", values.len()));
    }

    let x = values[0]
        .parse::<f64>()
        .map_err(|e| format!("please check your numbers ({}: {})", values[0], e))?;
    let y = values[1]
        .parse::<f64>()
        .map_err(|e| format!("please check your numbers ({}: {})", values[1], e))?;
    if !x.is_finite() || !y.is_finite() {
        return Err("coordinates must be finite".to_string());
    }
    Ok((x, y))
}
