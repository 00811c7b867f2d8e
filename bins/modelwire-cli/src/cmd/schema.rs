use crate::config::{GlobalArgs, SchemaArgs};
use crate::error::CliError;

use super::Session;

pub fn run(global: &GlobalArgs, args: &SchemaArgs) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let (_, schema) = session.resolve(&args.type_name)?;

    println!("{} ({} fields)", schema.name(), schema.len());
    println!("{:>5}  {:<20} {:<7} type", "id", "name", "wire");
    for field in schema.fields() {
        println!(
            "{:>5}  {:<20} {:<7} {}",
            field.id,
            field.name,
            field.ty.wire_type().name(),
            field.ty
        );
    }
    Ok(())
}
