use crate::config::GlobalArgs;
use crate::error::CliError;

use super::Session;

pub fn run(global: &GlobalArgs) -> Result<(), CliError> {
    let session = Session::open(global)?;
    let names = session.catalog.type_names();

    let mut failed = 0;
    for name in &names {
        match session.resolve(name) {
            Ok((_, schema)) => println!("ok    {name} ({} fields)", schema.len()),
            Err(e) => {
                tracing::error!(type_name = %name, error = %e, "schema derivation failed");
                println!("FAIL  {name}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Check {
            failed,
            total: names.len(),
        });
    }
    Ok(())
}
