use crate::error::ShellError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Flags {
    flags: HashMap<String, Flag>,
    order: Vec<String>,
    query: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Flag {
    pub short: String,
    pub long: String,
    pub description: String,
    pub takes_value: bool,
    pub value: Option<String>,
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

impl Flags {
    pub fn new() -> Self {
        let mut flags = Flags {
            flags: HashMap::new(),
            order: Vec::new(),
            query: Vec::new(),
        };

        flags.add("help", "-h", "--help", "Print this help message", false);
        flags.add("version", "-v", "--version", "Show version information", false);
        flags.add("quiet", "-q", "--quiet", "Print only the generated command", false);
        flags.add("debug", "-d", "--debug", "Enable debug logging", false);
        flags.add("server", "-s", "--server", "Generation server URL", true);
        flags.add("timeout", "-t", "--timeout", "Request timeout in seconds", true);
        flags.add("config", "-c", "--config", "Use a different startup file", true);
        flags.add("ping", "-p", "--ping", "Check that the server is healthy", false);
        flags.add("wait", "-w", "--wait", "Wait up to 30s for the server", false);

        flags
    }

    fn add(&mut self, name: &str, short: &str, long: &str, description: &str, takes_value: bool) {
        self.order.push(name.to_string());
        self.flags.insert(
            name.to_string(),
            Flag {
                short: short.to_string(),
                long: long.to_string(),
                description: description.to_string(),
                takes_value,
                value: None,
            },
        );
    }

    /// Flags come first; the first word that is not a flag, or anything
    /// after `--`, starts the one-shot query.
    pub fn parse(&mut self, args: &[String]) -> Result<(), ShellError> {
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];

            if arg == "--" {
                self.query.extend(args[i + 1..].iter().cloned());
                break;
            }
            if !arg.starts_with('-') || arg == "-" {
                self.query.extend(args[i..].iter().cloned());
                break;
            }

            let flag = self
                .flags
                .values_mut()
                .find(|flag| arg == &flag.short || arg == &flag.long)
                .ok_or_else(|| ShellError::FlagError(format!("unknown flag {}", arg)))?;

            if flag.takes_value {
                match args.get(i + 1) {
                    Some(value) => {
                        flag.value = Some(value.clone());
                        i += 1;
                    }
                    None => {
                        return Err(ShellError::FlagError(format!(
                            "Flag {} requires a value",
                            arg
                        )))
                    }
                }
            } else {
                flag.value = Some("true".to_string());
            }
            i += 1;
        }
        Ok(())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.flags
            .get(name)
            .and_then(|f| f.value.as_ref())
            .is_some()
    }

    pub fn get_value(&self, name: &str) -> Option<&String> {
        self.flags
            .get(name)
            .filter(|f| f.takes_value)
            .and_then(|f| f.value.as_ref())
    }

    /// Positional words joined into a single request, if any were given.
    pub fn query(&self) -> Option<String> {
        if self.query.is_empty() {
            None
        } else {
            Some(self.query.join(" "))
        }
    }

    pub fn print_help(&self) {
        println!("Usage: ashell [OPTIONS] [QUERY...]");
        println!("\nWith no QUERY, starts an interactive session.");
        println!("\nOptions:");
        for flag in self.order.iter().filter_map(|name| self.flags.get(name)) {
            let long = if flag.takes_value {
                format!("{} <VALUE>", flag.long)
            } else {
                flag.long.clone()
            };
            println!("  {}, {:<19} {}", flag.short, long, flag.description);
        }
    }
}
