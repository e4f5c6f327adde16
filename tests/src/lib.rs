//! Workspace-level tests that drive binstr through real files and
//! randomly generated string tables.

#[cfg(test)]
mod end_to_end;
#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;

#[cfg(test)]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
