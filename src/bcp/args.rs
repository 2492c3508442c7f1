//! Translation of `BcpOptions` into bcp arguments.

use crate::config::BcpOptions;

/// One bcp argument.
///
/// `value` is what the tool receives as a single argv entry. `token` is how
/// the argument is written on a rendered command line, with string values
/// JSON-quoted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    Plain(String),
    Quoted(String),
    /// A flag with its value attached (`-r"-|-"`)
    Glued(&'static str, String),
}

impl Arg {
    pub fn value(&self) -> String {
        match self {
            Arg::Plain(value) | Arg::Quoted(value) => value.clone(),
            Arg::Glued(flag, value) => format!("{flag}{value}"),
        }
    }

    pub fn token(&self) -> String {
        match self {
            Arg::Plain(value) => value.clone(),
            Arg::Quoted(value) => json_quote(value),
            Arg::Glued(flag, value) => format!("{flag}{}", json_quote(value)),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Plain(value.to_string())
    }
}

/// Build the ordered command-line tokens for a bcp invocation.
///
/// `omit_format` is set for data-transfer steps that pass their own format
/// file (`-f`); the encoding flag is irrelevant there and is left out.
/// Unset values are skipped, never reported.
pub fn build_args(options: &BcpOptions, omit_format: bool) -> Vec<String> {
    build_arg_list(options, omit_format).iter().map(Arg::token).collect()
}

/// The arguments behind `build_args`, unquoted.
pub fn build_arg_list(options: &BcpOptions, omit_format: bool) -> Vec<Arg> {
    let mut args = Vec::new();

    push_number(&mut args, "-a", options.packet_size.map(u64::from));
    push_number(&mut args, "-b", options.batch_size);
    push_number(&mut args, "-F", options.first_row);
    push_number(&mut args, "-L", options.last_row);
    push_number(&mut args, "-m", options.max_errors);

    if options.unicode && !omit_format {
        args.push("-w".into());
    }

    push_quoted(&mut args, "-e", options.error_file.as_deref());
    push_quoted(&mut args, "-i", options.input_file.as_deref());
    push_quoted(&mut args, "-C", options.code_page.as_deref());
    push_terminator(&mut args, "-r", options.row_terminator.as_deref());
    push_terminator(&mut args, "-t", options.field_terminator.as_deref());

    push_switch(&mut args, "-k", options.keep_nulls);
    push_switch(&mut args, "-E", options.keep_identity);
    push_switch(&mut args, "-q", options.quoted_identifiers);
    push_switch(&mut args, "-R", options.regional);

    push_plain(&mut args, "-S", options.server.as_deref());

    // Trusted connections ignore credentials entirely
    if options.trusted {
        args.push("-T".into());
    } else {
        push_plain(&mut args, "-U", options.user.as_deref());
        push_plain(&mut args, "-P", options.password.as_deref());
    }

    let hints = build_hints(options);
    if !hints.is_empty() {
        args.push("-h".into());
        args.push(Arg::Quoted(hints.join(",")));
    }

    args
}

/// Hint keywords in the order bcp documents them.
pub fn build_hints(options: &BcpOptions) -> Vec<String> {
    let mut hints = Vec::new();

    if let Some(order) = non_empty(options.order.as_deref()) {
        hints.push(format!("ORDER({order})"));
    }
    if let Some(rows) = options.rows_per_batch.filter(|n| *n != 0) {
        hints.push(format!("ROWS_PER_BATCH={rows}"));
    }
    if let Some(kilobytes) = options.kilobytes_per_batch.filter(|n| *n != 0) {
        hints.push(format!("KILOBYTES_PER_BATCH={kilobytes}"));
    }
    if options.tablock {
        hints.push("TABLOCK".to_string());
    }
    if options.check_constraints {
        hints.push("CHECK_CONSTRAINTS".to_string());
    }
    if options.fire_triggers {
        hints.push("FIRE_TRIGGERS".to_string());
    }

    hints
}

/// Qualify a table name as `database.schema.[table]`, or `database..[table]`
/// when only the database is set.
///
/// With quoted identifiers the whole name is JSON-quoted on the command line.
pub fn qualify_table(options: &BcpOptions, table: &str) -> String {
    table_arg(options, table).token()
}

/// The qualified table as a bcp argument.
pub fn table_arg(options: &BcpOptions, table: &str) -> Arg {
    let mut name = format!("[{table}]");

    let schema = non_empty(options.schema.as_deref());
    if let Some(schema) = schema {
        name = format!("{schema}.{name}");
    }
    if let Some(database) = non_empty(options.database.as_deref()) {
        // `db..[table]` selects the default schema
        name = if schema.is_some() {
            format!("{database}.{name}")
        } else {
            format!("{database}..{name}")
        };
    }

    if options.quoted_identifiers { Arg::Quoted(name) } else { Arg::Plain(name) }
}

/// Quote a value the way a JSON string literal is written.
pub fn json_quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn push_number(args: &mut Vec<Arg>, flag: &str, value: Option<u64>) {
    if let Some(value) = value.filter(|n| *n != 0) {
        args.push(flag.into());
        args.push(Arg::Plain(value.to_string()));
    }
}

fn push_plain(args: &mut Vec<Arg>, flag: &str, value: Option<&str>) {
    if let Some(value) = non_empty(value) {
        args.push(flag.into());
        args.push(value.into());
    }
}

fn push_quoted(args: &mut Vec<Arg>, flag: &str, value: Option<&str>) {
    if let Some(value) = non_empty(value) {
        args.push(flag.into());
        args.push(Arg::Quoted(value.to_string()));
    }
}

fn push_terminator(args: &mut Vec<Arg>, flag: &'static str, value: Option<&str>) {
    let Some(value) = non_empty(value) else {
        return;
    };
    // A separate value starting with - or / would be read as another flag
    if value.starts_with('-') || value.starts_with('/') {
        args.push(Arg::Glued(flag, value.to_string()));
    } else {
        args.push(flag.into());
        args.push(Arg::Quoted(value.to_string()));
    }
}

fn push_switch(args: &mut Vec<Arg>, flag: &str, enabled: bool) {
    if enabled {
        args.push(flag.into());
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
