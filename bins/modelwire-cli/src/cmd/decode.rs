use crate::config::{DecodeArgs, GlobalArgs};
use crate::error::CliError;
use crate::json;

use super::{Session, read_input, write_output};

pub fn run(global: &GlobalArgs, args: &DecodeArgs) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let (descriptor, schema) = session.resolve(&args.type_name)?;

    let input = read_input(args.input.as_deref())?;
    let bytes = if args.hex {
        hex::decode(input.trim_ascii())?
    } else {
        input
    };

    let value = session.codec.decode_value(&descriptor, &bytes)?;
    tracing::info!(type_name = %args.type_name, bytes = bytes.len(), "decoded record");

    let document = json::from_struct(&schema, &value);
    let mut text = if args.compact {
        serde_json::to_string(&document)
    } else {
        serde_json::to_string_pretty(&document)
    }
    .map_err(|e| CliError::json("output", e.to_string()))?;
    text.push('\n');
    write_output(None, text.as_bytes())
}
