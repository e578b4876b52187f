//!
//! insectid console
//! ----------------
//! Interactive front-end for the insect identifier service. Signs in and out,
//! resolves the account's role and shows which sections that role may open.

use std::env;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use insectid::app::AppContext;
use insectid::backend::{FeedbackDecision, FeedbackEntry, HttpBackend, LabeledFile};
use insectid::cli::{
    render_feedback, render_label_tasks, render_profile, render_sections, render_status, render_users, ConsoleNotifier,
};
use insectid::config::ClientConfig;
use insectid::identity::Role;
use insectid::validation::{AdminForm, SignInForm, SignUpForm};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--base-url <url>] [--session-file <path>]\n\nFlags:\n  --base-url <url>         Backend address (env INSECTID_BASE_URL or BASE_URL; default 127.0.0.1:8080)\n  --session-file <path>    Keep the session in this JSON file across restarts (env INSECTID_SESSION_FILE)\n  -h, --help               Show this help\n\nInteractive commands:\n  sign-in <email> <password>                          start a session\n  sign-up <username> <email> <password> <repassword>  create an account (sign in afterwards)\n  sign-out                                            end the session (asks for confirmation)\n  role                                                retry the role lookup\n  sections                                            list the sections you can open\n  info                                                show your user info\n  feedback-on <file>[=<label>]...                     tell which label your uploaded pictures should have had\n  label-tasks                                         list pictures waiting for a label\n  label <image> <label>                               label one picture\n  users                                               list accounts (user admins)\n  toggle-users <email>...                             suspend or reinstate accounts (user admins)\n  add-admin <username> <email> <password> <repassword> <user|model>\n                                                      create an administrator (user admins)\n  feedback                                            list feedback waiting for review (user admins)\n  review <accept|reject> <index>...                   decide on listed feedback (user admins)\n  ssh                                                 start the web terminal (model admins)\n  status                                              show session state\n  help                                                show this help\n  quit | exit                                         leave the console"
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config = ClientConfig::from_env().context("Failed to read configuration from environment")?;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--base-url" => {
                if i + 1 >= args.len() { eprintln!("--base-url requires a value"); print_usage(&program); std::process::exit(2); }
                config = config.with_base_url(&args[i + 1])?;
                i += 2; continue;
            }
            "--session-file" => {
                if i + 1 >= args.len() { eprintln!("--session-file requires a value"); print_usage(&program); std::process::exit(2); }
                config = config.with_session_file(&args[i + 1]);
                i += 2; continue;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    info!(
        target: "insectid",
        "insectid starting: base_url='{}', auth_header='{}', session_file={:?}, remote_sign_out={}",
        config.base_url, config.auth_header, config.session_file, config.remote_sign_out
    );

    let ctx = AppContext::from_config(&config, Arc::new(ConsoleNotifier))?;

    // The UI loop is single-threaded; requests suspend only at await points.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    rt.block_on(ctx.start());
    run_repl(&rt, &ctx)
}

fn run_repl(rt: &tokio::runtime::Runtime, ctx: &AppContext<HttpBackend>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    let mut pending_feedback: Vec<FeedbackEntry> = Vec::new();
    println!("insectid console. Type 'help' for commands.");
    println!("{}", render_sections(&ctx.visible_sections()));
    loop {
        input.clear();
        print!("> "); let _ = stdout.flush();
        match stdin.read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = input.trim();
        if line.is_empty() { continue; }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0].to_ascii_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => print_usage("insectid"),
            "sign-in" => {
                if parts.len() != 3 { eprintln!("usage: sign-in <email> <password>"); continue; }
                let form = SignInForm::new(parts[1], parts[2]);
                if rt.block_on(ctx.sign_in(&form)).is_ok() {
                    println!("{}", render_sections(&ctx.visible_sections()));
                }
            }
            "sign-up" => {
                if parts.len() != 5 { eprintln!("usage: sign-up <username> <email> <password> <repassword>"); continue; }
                let form = SignUpForm {
                    username: parts[1].to_string(),
                    email: parts[2].to_string(),
                    password: parts[3].to_string(),
                    repassword: parts[4].to_string(),
                };
                let _ = rt.block_on(ctx.sign_up(&form));
            }
            "sign-out" => {
                if ctx.state().signed_in && !confirm("Would you like to sign out? [y/N] ")? { continue; }
                if rt.block_on(ctx.sign_out()).is_ok() {
                    println!("{}", render_sections(&ctx.visible_sections()));
                }
            }
            "role" => {
                if let Ok(Some(role)) = rt.block_on(ctx.refresh_role()) {
                    println!("role: {}", role);
                }
                println!("{}", render_sections(&ctx.visible_sections()));
            }
            "sections" => println!("{}", render_sections(&ctx.visible_sections())),
            "info" => {
                if let Ok(profile) = rt.block_on(ctx.user_info()) {
                    println!("{}", render_profile(&profile));
                }
            }
            "feedback-on" => {
                if parts.len() < 2 { eprintln!("usage: feedback-on <file>[=<label>]..."); continue; }
                let files: Vec<LabeledFile> = parts[1..]
                    .iter()
                    .map(|p| match p.split_once('=') {
                        Some((f, l)) if !l.is_empty() => LabeledFile { filename: f.to_string(), label: Some(l.to_string()) },
                        Some((f, _)) => LabeledFile { filename: f.to_string(), label: None },
                        None => LabeledFile { filename: p.to_string(), label: None },
                    })
                    .collect();
                let _ = rt.block_on(ctx.submit_feedback(&files));
            }
            "label-tasks" => {
                if let Ok(tasks) = rt.block_on(ctx.label_tasks()) {
                    println!("{}", render_label_tasks(&tasks));
                }
            }
            "label" => {
                if parts.len() < 3 { eprintln!("usage: label <image> <label>"); continue; }
                let label = parts[2..].join(" ");
                if rt.block_on(ctx.submit_label(parts[1], &label)).is_ok() {
                    println!("labelled {} as '{}'", parts[1], label);
                }
            }
            "users" => {
                if let Ok(users) = rt.block_on(ctx.list_users()) {
                    println!("{}", render_users(&users));
                }
            }
            "toggle-users" => {
                let emails: Vec<String> = parts[1..].iter().map(|e| e.to_string()).collect();
                if rt.block_on(ctx.toggle_users(&emails)).is_ok() {
                    println!("toggled {} account(s)", emails.len());
                }
            }
            "add-admin" => {
                if parts.len() != 6 { eprintln!("usage: add-admin <username> <email> <password> <repassword> <user|model>"); continue; }
                let role = match parts[5].to_ascii_lowercase().as_str() {
                    "user" => Role::UserAdmin,
                    "model" => Role::ModelAdmin,
                    _ => Role::Unknown,
                };
                let form = AdminForm {
                    username: parts[1].to_string(),
                    email: parts[2].to_string(),
                    password: parts[3].to_string(),
                    repassword: parts[4].to_string(),
                    role,
                };
                let _ = rt.block_on(ctx.add_admin(&form));
            }
            "feedback" => {
                if let Ok(entries) = rt.block_on(ctx.list_feedback()) {
                    println!("{}", render_feedback(&entries));
                    pending_feedback = entries;
                }
            }
            "review" => {
                let acceptable = match parts.get(1).map(|v| v.to_ascii_lowercase()) {
                    Some(v) if v == "accept" => true,
                    Some(v) if v == "reject" => false,
                    _ => { eprintln!("usage: review <accept|reject> <index>..."); continue; }
                };
                let mut decisions = Vec::new();
                for raw in &parts[2..] {
                    match raw.parse::<usize>().ok().and_then(|i| pending_feedback.get(i)) {
                        Some(entry) => decisions.push(FeedbackDecision::for_entry(entry, acceptable)),
                        None => eprintln!("no listed feedback #{}; run 'feedback' first", raw),
                    }
                }
                if rt.block_on(ctx.review_feedback(&decisions)).is_ok() {
                    println!("{} {} feedback item(s)", if acceptable { "accepted" } else { "rejected" }, decisions.len());
                }
            }
            "ssh" => {
                if let Ok(dest) = rt.block_on(ctx.authenticate_ssh()) {
                    println!("web terminal: {}", dest);
                }
            }
            "status" => {
                let cred = ctx.credential();
                println!("{}", render_status(&ctx.state(), cred.user_identifier.as_deref()));
            }
            other => eprintln!("unknown command '{}'; type 'help'", other),
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
