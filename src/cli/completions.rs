use crate::cli::args::{Cli, CompletionHelperCommands};
use crate::cli::commands::load_registry;
use crate::utils::errors::Result;
use crate::utils::output::OutputFormat;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;
use std::path::Path;

const APP_NAME: &str = "hostca";

pub fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();

    // For bash, complete authority names and columns from the live config
    if matches!(shell, Shell::Bash) {
        println!("# Enhanced completion for hostca authorities");
        print!(
            r#"
_hostca_complete_authorities() {{
    local authorities
    authorities=$(hostca completion-helper authorities 2>/dev/null)
    COMPREPLY=($(compgen -W "$authorities" -- "${{cur}}"))
}}

_hostca_complete_columns() {{
    local columns prefix="" current_word="${{cur}}"
    columns=$(hostca completion-helper columns 2>/dev/null)

    if [[ "$current_word" == +* ]]; then
        prefix="+"
        current_word="${{current_word:1}}"
    fi
    if [[ "$current_word" == *,* ]]; then
        prefix="${{prefix}}${{current_word%,*}},"
        current_word="${{current_word##*,}}"
    fi

    local word_list=""
    for col in $columns; do
        if [[ "$col" == "$current_word"* ]]; then
            word_list="$word_list ${{prefix}}${{col}}"
        fi
    done
    COMPREPLY=($(compgen -W "$word_list" -- "${{cur}}"))
}}

_hostca_override() {{
    local cur prev words cword
    _init_completion || return

    case "$prev" in
        "issue"|"show"|"list"|"verify")
            _hostca_complete_authorities
            return 0
            ;;
        "--columns")
            _hostca_complete_columns
            return 0
            ;;
    esac

    _hostca "$@"
}}

"#
        );

        generate(shell, &mut cmd, APP_NAME, &mut io::stdout());

        println!();
        println!("complete -F _hostca_override hostca");
    } else {
        generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    }

    Ok(())
}

pub fn handle_completion_helper_command(
    command: &CompletionHelperCommands,
    config: Option<&Path>,
    output: &OutputFormat,
) -> Result<()> {
    match command {
        CompletionHelperCommands::Authorities => {
            // Silently print nothing without a usable config
            if let Ok(registry) = load_registry(config) {
                let names: Vec<&str> = registry.names().collect();
                output.print_list(&names);
            }
        }
        CompletionHelperCommands::Columns => {
            let columns = [
                "cn",
                "serial",
                "not_before",
                "not_after",
                "sans",
                "key_usage",
                "extended_key_usage",
                "issuer",
                "authority",
                "fingerprint",
                "expired",
            ];
            output.print_list(&columns);
        }
    }

    Ok(())
}
