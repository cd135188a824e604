use crate::config::{BrokerConfig, HelperConfig};
use crate::launch::CommandSpec;
use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;

/// Builds the broker invocation from the container arguments.
///
/// * no arguments: the configured broker with its default arguments
/// * first argument is a flag: the configured broker followed by all arguments
/// * otherwise the arguments are the full command line
///
/// Arguments are passed through unmodified and in order.
pub fn resolve_broker_command(broker: &BrokerConfig, args: Vec<OsString>) -> CommandSpec {
    let mut args = args.into_iter();

    match args.next() {
        None => CommandSpec::new(
            &broker.program,
            broker.default_args.iter().map(OsString::from).collect(),
        ),
        Some(first) if first.as_bytes().starts_with(b"-") => {
            CommandSpec::new(&broker.program, std::iter::once(first).chain(args).collect())
        }
        Some(program) => CommandSpec::new(program, args.collect()),
    }
}

pub fn helper_command(helper: &HelperConfig) -> CommandSpec {
    CommandSpec::new(
        &helper.program,
        helper.argv().into_iter().map(OsString::from).collect(),
    )
}
