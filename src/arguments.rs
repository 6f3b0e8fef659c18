//! Per-command argument schemas.
//!
//! Each command the client knows how to parameterise has a fixed schema.
//! Positional and keyed input are validated by separate paths that must
//! agree on the outcome for the same logical arguments.
//!
//! | Command              | Positional           | Keyed                                    |
//! |----------------------|----------------------|------------------------------------------|
//! | `iface-stat`         | exactly 1            | `iface`                                  |
//! | `pcap-file`          | 2 or 3               | `filename`, `output-dir`, [`tenant`]     |
//! | `conf-get`           | exactly 1            | `variable`                               |
//! | tenant (un)register  | ignored              | ignored                                  |
//!
//! Commands without arguments accept and ignore anything they are given.

use crate::error::SocketError;
use crate::message::{ArgValue, Arguments, KeyedArguments};

/// Commands that never carry an argument mapping.
pub const NO_ARGUMENT_COMMANDS: [&str; 4] = [
    "register-tenant",
    "unregister-tenant",
    "register-tenant-handler",
    "unregister-tenant-handler",
];

/// Argument schema of a known command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSchema {
    /// `iface-stat <iface>`
    IfaceStat,
    /// `pcap-file <filename> <output-dir> [tenant]`
    PcapFile,
    /// `conf-get <variable>`
    ConfGet,
    /// Tenant registration commands, no arguments.
    NoArguments,
}

impl CommandSchema {
    /// Schema for `command`, or `None` if the command is not in the table.
    pub fn for_command(command: &str) -> Option<Self> {
        match command {
            "iface-stat" => Some(CommandSchema::IfaceStat),
            "pcap-file" => Some(CommandSchema::PcapFile),
            "conf-get" => Some(CommandSchema::ConfGet),
            c if NO_ARGUMENT_COMMANDS.contains(&c) => Some(CommandSchema::NoArguments),
            _ => None,
        }
    }

    pub(crate) fn lookup(command: &str, count: usize) -> Result<Self, SocketError> {
        Self::for_command(command).ok_or_else(|| SocketError::UnknownCommand {
            command: command.to_string(),
            count,
        })
    }

    /// Build the argument mapping from positional arguments.
    ///
    /// Returns `Ok(None)` for commands that take no arguments.
    pub fn encode_positional<S: AsRef<str>>(
        self,
        command: &str,
        arguments: &[S],
    ) -> Result<Option<Arguments>, SocketError> {
        let mut mapping = Arguments::new();

        match self {
            CommandSchema::IfaceStat => {
                let [iface] = arguments else {
                    return Err(SocketError::validation(
                        command,
                        format!("{} should have one argument, found {}", command, arguments.len()),
                    ));
                };
                mapping.insert("iface".into(), iface.as_ref().into());
            }
            CommandSchema::PcapFile => {
                if !(2..=3).contains(&arguments.len()) {
                    return Err(SocketError::validation(
                        command,
                        format!(
                            "{} should have 2 or 3 arguments, found {}",
                            command,
                            arguments.len()
                        ),
                    ));
                }
                mapping.insert("filename".into(), arguments[0].as_ref().into());
                mapping.insert("output-dir".into(), arguments[1].as_ref().into());
                if let Some(tenant) = arguments.get(2) {
                    mapping.insert("tenant".into(), parse_tenant(command, tenant.as_ref())?);
                }
            }
            CommandSchema::ConfGet => {
                let [variable] = arguments else {
                    return Err(SocketError::validation(
                        command,
                        format!("{} should have one argument, found {}", command, arguments.len()),
                    ));
                };
                mapping.insert("variable".into(), variable.as_ref().into());
            }
            CommandSchema::NoArguments => return Ok(None),
        }

        Ok(Some(mapping))
    }

    /// Build the argument mapping from keyed arguments.
    ///
    /// Only the first value of each key is used; unrelated keys are ignored.
    pub fn encode_keyed(
        self,
        command: &str,
        arguments: &KeyedArguments,
    ) -> Result<Option<Arguments>, SocketError> {
        let mut mapping = Arguments::new();

        match self {
            CommandSchema::IfaceStat => {
                let iface = required(command, arguments, "iface")?;
                mapping.insert("iface".into(), iface.into());
            }
            CommandSchema::PcapFile => {
                let filename = required(command, arguments, "filename")?;
                let output_dir = required(command, arguments, "output-dir")?;
                mapping.insert("filename".into(), filename.into());
                mapping.insert("output-dir".into(), output_dir.into());
                if let Some(tenant) = first(arguments, "tenant") {
                    mapping.insert("tenant".into(), parse_tenant(command, tenant)?);
                }
            }
            CommandSchema::ConfGet => {
                let variable = required(command, arguments, "variable")?;
                mapping.insert("variable".into(), variable.into());
            }
            CommandSchema::NoArguments => return Ok(None),
        }

        Ok(Some(mapping))
    }
}

fn first<'a>(arguments: &'a KeyedArguments, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(|values| values.first())
        .map(String::as_str)
}

fn required<'a>(
    command: &str,
    arguments: &'a KeyedArguments,
    key: &str,
) -> Result<&'a str, SocketError> {
    first(arguments, key).ok_or_else(|| {
        let mut keys: Vec<&str> = arguments.keys().map(String::as_str).collect();
        keys.sort_unstable();
        SocketError::validation(
            command,
            format!("{} should have a {} parameter, found keys {:?}", command, key, keys),
        )
    })
}

fn parse_tenant(command: &str, value: &str) -> Result<ArgValue, SocketError> {
    value
        .parse::<i64>()
        .map(ArgValue::Int)
        .map_err(|_| {
            SocketError::validation(command, format!("tenant ID is not an integer: {}", value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn keyed(pairs: &[(&str, &str)]) -> KeyedArguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
            .collect()
    }

    fn expected(pairs: &[(&str, ArgValue)]) -> Arguments {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn positional(command: &str, args: &[&str]) -> Result<Option<Arguments>, SocketError> {
        CommandSchema::lookup(command, args.len())?.encode_positional(command, args)
    }

    fn by_key(command: &str, args: &KeyedArguments) -> Result<Option<Arguments>, SocketError> {
        CommandSchema::lookup(command, args.len())?.encode_keyed(command, args)
    }

    #[test]
    fn test_no_argument_commands_ignore_extras() {
        for command in NO_ARGUMENT_COMMANDS {
            assert_eq!(positional(command, &[]).unwrap(), None);
            assert_eq!(positional(command, &["1", "2", "3"]).unwrap(), None);
            assert_eq!(by_key(command, &keyed(&[("tenant", "1")])).unwrap(), None);
        }
    }

    #[test]
    fn test_iface_stat() {
        let want = Some(expected(&[("iface", "eth0".into())]));
        assert_eq!(positional("iface-stat", &["eth0"]).unwrap(), want);
        assert_eq!(by_key("iface-stat", &keyed(&[("iface", "eth0")])).unwrap(), want);

        for args in [&[] as &[&str], &["eth0", "eth1"][..]] {
            let err = positional("iface-stat", args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(err.to_string().contains("iface-stat"));
            assert!(err.to_string().contains(&format!("found {}", args.len())));
        }

        let err = by_key("iface-stat", &keyed(&[("interface", "eth0")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("interface"));
    }

    #[test]
    fn test_pcap_file_without_tenant() {
        let want = Some(expected(&[
            ("filename", "cap.pcap".into()),
            ("output-dir", "/out".into()),
        ]));
        assert_eq!(positional("pcap-file", &["cap.pcap", "/out"]).unwrap(), want);
        assert_eq!(
            by_key(
                "pcap-file",
                &keyed(&[("filename", "cap.pcap"), ("output-dir", "/out")])
            )
            .unwrap(),
            want
        );
    }

    #[test]
    fn test_pcap_file_with_tenant() {
        let want = Some(expected(&[
            ("filename", "cap.pcap".into()),
            ("output-dir", "/out".into()),
            ("tenant", ArgValue::Int(7)),
        ]));
        assert_eq!(
            positional("pcap-file", &["cap.pcap", "/out", "7"]).unwrap(),
            want
        );
        assert_eq!(
            by_key(
                "pcap-file",
                &keyed(&[("filename", "cap.pcap"), ("output-dir", "/out"), ("tenant", "7")])
            )
            .unwrap(),
            want
        );
    }

    #[test]
    fn test_pcap_file_rejects_non_numeric_tenant() {
        let err = positional("pcap-file", &["cap.pcap", "/out", "x"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("tenant ID is not an integer"));

        let err = by_key(
            "pcap-file",
            &keyed(&[("filename", "cap.pcap"), ("output-dir", "/out"), ("tenant", "x")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("tenant ID is not an integer"));
    }

    #[test]
    fn test_pcap_file_wrong_counts() {
        for args in [&["cap.pcap"][..], &["a", "b", "1", "d"][..]] {
            let err = positional("pcap-file", args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        let err = by_key("pcap-file", &keyed(&[("filename", "cap.pcap")])).unwrap_err();
        assert!(err.to_string().contains("output-dir"));
    }

    #[test]
    fn test_keyed_empty_value_list_counts_as_missing() {
        let mut args = KeyedArguments::new();
        args.insert("variable".into(), Vec::new());
        let err = by_key("conf-get", &args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_keyed_uses_first_value() {
        let mut args = KeyedArguments::new();
        args.insert("variable".into(), vec!["a".into(), "b".into()]);
        assert_eq!(
            by_key("conf-get", &args).unwrap(),
            Some(expected(&[("variable", "a".into())]))
        );
    }

    #[test]
    fn test_conf_get() {
        assert_eq!(
            positional("conf-get", &["threading.set-cpu-affinity"]).unwrap(),
            Some(expected(&[("variable", "threading.set-cpu-affinity".into())]))
        );
        assert!(positional("conf-get", &[]).is_err());
        assert!(positional("conf-get", &["a", "b"]).is_err());
        assert!(by_key("conf-get", &KeyedArguments::new()).is_err());
    }

    #[test]
    fn test_unknown_command() {
        for args in [&[] as &[&str], &["a"][..], &["a", "b", "c"][..]] {
            let err = positional("frobnicate", args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownCommand);
        }
        let err = by_key("frobnicate", &keyed(&[("iface", "eth0")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
        assert!(err.to_string().contains("\"frobnicate\" with 1 arguments"));
    }
}
