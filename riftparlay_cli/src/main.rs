use clap::{App, Arg, SubCommand};

mod command_circuit;
mod command_entry;
mod command_oracle;
mod rest;

fn main() {
    let matches = App::new("RiftParlay CLI")
        .version("0.1.0")
        .about("Interacts with a riftparlay server")
        .arg(
            Arg::with_name("uri")
                .long("uri")
                .takes_value(true)
                .help("Server uri - can also be set with RIFTPARLAY_URI")
                .required(false),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("create")
                .about("Create a new circuit")
                .arg(Arg::with_name("ID").index(1).required(true))
                .arg(Arg::with_name("HEADLINE").index(2).required(true))
                .arg(
                    Arg::with_name("DURATION")
                        .index(3)
                        .required(true)
                        .help("Open window in seconds (600 to 345600)"),
                )
                .arg(
                    Arg::with_name("creator")
                        .long("creator")
                        .takes_value(true)
                        .required(true)
                        .help("Identity of the creating caller"),
                ),
        )
        .subcommand(SubCommand::with_name("list").about("List all circuit ids"))
        .subcommand(
            SubCommand::with_name("show")
                .about("Show a circuit snapshot")
                .arg(Arg::with_name("ID").index(1).required(true)),
        )
        .subcommand(
            SubCommand::with_name("enter")
                .about("Place an encrypted entry in a circuit")
                .arg(Arg::with_name("ID").index(1).required(true))
                .arg(
                    Arg::with_name("participant")
                        .long("participant")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("ciphertext")
                        .long("ciphertext")
                        .takes_value(true)
                        .required(true)
                        .help("Hex-encoded encrypted pathline choice"),
                ),
        )
        .subcommand(
            SubCommand::with_name("entrants")
                .about("List a circuit's entrants")
                .arg(Arg::with_name("ID").index(1).required(true)),
        )
        .subcommand(
            SubCommand::with_name("entered")
                .about("Check whether a participant has entered")
                .arg(Arg::with_name("ID").index(1).required(true))
                .arg(Arg::with_name("PARTICIPANT").index(2).required(true)),
        )
        .subcommand(
            SubCommand::with_name("reveal")
                .about("Request vote revelation once the lock has passed")
                .arg(Arg::with_name("ID").index(1).required(true)),
        )
        .subcommand(
            SubCommand::with_name("tally")
                .about("Submit the oracle's decrypted vote counts")
                .arg(Arg::with_name("ID").index(1).required(true))
                .arg(
                    Arg::with_name("VOTES")
                        .index(2)
                        .required(true)
                        .multiple(true)
                        .max_values(4)
                        .help("Four counts, one per pathline"),
                ),
        )
        .subcommand(
            SubCommand::with_name("settle")
                .about("Settle a circuit")
                .arg(Arg::with_name("ID").index(1).required(true)),
        )
        .subcommand(
            SubCommand::with_name("cancel")
                .about("Cancel a circuit (creator only)")
                .arg(Arg::with_name("ID").index(1).required(true))
                .arg(
                    Arg::with_name("caller")
                        .long("caller")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("events")
                .about("Dump the event log")
                .arg(Arg::with_name("ID").index(1).required(false)),
        )
        .get_matches();

    let env_var = std::env::var("RIFTPARLAY_URI");
    let uri = match matches.value_of("uri") {
        Some(uri) => uri,
        None => env_var.as_deref().unwrap_or("http://localhost:8000"),
    };
    if matches.occurrences_of("v") > 0 {
        println!("URI: {}", uri);
    }

    // Subcommands
    if let Some(matches) = matches.subcommand_matches("create") {
        command_circuit::command_create(matches, uri);
    }
    if matches.subcommand_matches("list").is_some() {
        command_circuit::command_list(uri);
    }
    if let Some(matches) = matches.subcommand_matches("show") {
        command_circuit::command_show(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("enter") {
        command_entry::command_enter(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("entrants") {
        command_entry::command_entrants(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("entered") {
        command_entry::command_entered(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("reveal") {
        command_oracle::command_reveal(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("tally") {
        command_oracle::command_tally(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("settle") {
        command_oracle::command_settle(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("cancel") {
        command_circuit::command_cancel(matches, uri);
    }
    if let Some(matches) = matches.subcommand_matches("events") {
        command_circuit::command_events(matches, uri);
    }
}

/// Print a response and exit non-zero if the server rejected the call.
pub fn finish(result: rest::ApiResponse) -> ! {
    match result {
        Ok((true, value)) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap());
            std::process::exit(0);
        }
        Ok((false, value)) => {
            eprintln!("{}", serde_json::to_string_pretty(&value).unwrap());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("riftparlay: request failed: {}", e);
            std::process::exit(1);
        }
    }
}
