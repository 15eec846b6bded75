use std::ffi::OsString;

use deskpad_core::error::ValidationError;

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = deskpad_core::run(args) {
        // Rejected input was already shown to the user by the widget.
        if err.downcast_ref::<ValidationError>().is_none() {
            eprintln!("error: {err:#}");
        }
        std::process::exit(1);
    }
}
