use rascal_build_core::CompilerCommand;

/// Splits the argument list into the launcher part and `-flag value` pairs
pub fn breakdown(command: &CompilerCommand) -> (Vec<String>, Vec<(String, Option<String>)>) {
    let mut launcher = Vec::new();
    let mut flags: Vec<(String, Option<String>)> = Vec::new();

    let mut i = 0;
    while i < command.args.len() {
        let arg = &command.args[i];
        let is_class = arg.starts_with("org.") || arg.contains(".shell.");

        if flags.is_empty() && !is_class && (arg == "-cp" || arg.starts_with("-D") || !arg.starts_with('-')) {
            launcher.push(arg.clone());
            if arg == "-cp" && i + 1 < command.args.len() {
                launcher.push(command.args[i + 1].clone());
                i += 1;
            }
        } else if is_class && flags.is_empty() {
            launcher.push(arg.clone());
        } else if arg.starts_with('-') {
            let value = command
                .args
                .get(i + 1)
                .filter(|next| !next.starts_with('-'))
                .cloned();
            if value.is_some() {
                i += 1;
            }
            flags.push((arg.clone(), value));
        } else {
            flags.push((arg.clone(), None));
        }

        i += 1;
    }

    (launcher, flags)
}

pub fn print_command_breakdown(command: &CompilerCommand) {
    println!("   🔧 Command breakdown:");
    println!("      • program: {}", command.program.display());

    let (launcher, flags) = breakdown(command);
    if !launcher.is_empty() {
        println!("      • launcher: {}", launcher.join(" "));
    }
    for (flag, value) in flags {
        match value {
            Some(value) if value.len() > 60 => {
                println!("      • {flag}:");
                for part in value.split([':', ';']).filter(|p| !p.is_empty()) {
                    println!("          {part}");
                }
            }
            Some(value) => println!("      • {flag}: {value}"),
            None => println!("      • {flag}"),
        }
    }

    if let Some(ref dir) = command.working_dir {
        println!("      • workingDir: {}", dir.display());
    }
    if !command.env.is_empty() {
        println!("      • env:");
        for (key, value) in &command.env {
            println!("          {key}={value}");
        }
    }
}
