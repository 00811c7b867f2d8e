use crate::config::{EncodeArgs, GlobalArgs};
use crate::error::CliError;
use crate::json;

use super::{Session, read_input, write_output};

pub fn run(global: &GlobalArgs, args: &EncodeArgs) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let (descriptor, schema) = session.resolve(&args.type_name)?;

    let input = read_input(args.input.as_deref())?;
    let document: serde_json::Value =
        serde_json::from_slice(&input).map_err(|e| CliError::json("input", e.to_string()))?;
    let value = json::to_struct(&schema, &document, &args.type_name)?;

    let bytes = session.codec.encode_value(&descriptor, &value)?;
    tracing::info!(type_name = %args.type_name, bytes = bytes.len(), "encoded record");

    if args.hex {
        let mut text = hex::encode(&bytes);
        text.push('\n');
        write_output(args.output.as_deref(), text.as_bytes())
    } else {
        write_output(args.output.as_deref(), &bytes)
    }
}
