use crate::{
    auth::{LoginForm, SystemClock, TrustOnSubmit},
    chat::{ChatMessage, ChatWidget, FixedGeolocator, Location, Sender},
    config::Config,
    i18n::{t, Language},
    portal::Portal,
    gate,
    role::{Page, Role},
    session::FileStore,
    state::Event,
    transcript::Transcript,
    views::{self, Frame},
    Args,
};
use anyhow::Result;
use rand::rngs::StdRng;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::path::Path;
use std::time::Instant;

pub struct Context {
    pub args: Args,
    pub run_id: String,
    pub config: Config,
    pub transcript: RefCell<Transcript>,
    pub portal: RefCell<Portal<FileStore>>,
    pub auth: TrustOnSubmit<SystemClock>,
    pub chat: RefCell<ChatWidget>,
    pub geolocator: FixedGeolocator,
    pub rng: RefCell<StdRng>,
    pub last_frame: RefCell<Option<Frame>>,
    pub tracing: RefCell<bool>,
}

fn trace(ctx: &Context, label: &str, content: &str) {
    if *ctx.tracing.borrow() {
        eprintln!("[TRACE:{}] {}", label, content);
    }
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose {
        eprintln!("[VERBOSE] {}", message);
    }
}

/// Render the current page, following a redirect to login
pub fn show(ctx: &Context) {
    // A redirect produces one blank frame; the second pass renders login
    for _ in 0..2 {
        let page = ctx.portal.borrow().state().page;
        let (decision, frame) = {
            let mut rng = ctx.rng.borrow_mut();
            let mut portal = ctx.portal.borrow_mut();
            portal.render(&mut *rng)
        };
        let _ = ctx.transcript.borrow_mut().gate_decision(page, decision);
        trace(ctx, "gate", &format!("{} -> {}", page, decision.as_str()));

        if let Some(frame) = frame {
            print_frame(&frame, ctx.portal.borrow().state().language);
            *ctx.last_frame.borrow_mut() = Some(frame);
            return;
        }
        verbose(ctx, &format!("{} is not available, redirecting to login", page));
    }
}

fn print_frame(frame: &Frame, lang: Language) {
    println!();
    println!("== {} ({}) ==", frame.title, frame.page.path());
    for line in &frame.lines {
        println!("  {}", line);
    }
    if !frame.links.is_empty() {
        println!("{}:", t("quick_links", lang));
        for (i, page) in frame.links.iter().enumerate() {
            println!("  [{}] {}", i + 1, views::title(*page, lang));
        }
    }
}

pub fn run_once(ctx: &Context, path: &str) -> Result<()> {
    let decision = gate::resolve_path(path, &ctx.portal.borrow().state().session);
    trace(ctx, "route", &format!("{} -> {}", path, decision.as_str()));
    navigate(ctx, Page::from_path(path));
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!(
        "{} - type /help for commands, /exit to quit",
        t("app.title", ctx.portal.borrow().state().language)
    );
    show(&ctx);

    loop {
        let prompt = prompt(&ctx);
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if line.starts_with('/') {
                    if handle_command(&ctx, line) {
                        break;
                    }
                    continue;
                }

                // Plain text goes to the assistant
                send_chat(&ctx, line);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    let dropped = ctx.chat.borrow_mut().cancel_pending();
    if dropped > 0 {
        verbose(&ctx, &format!("dropped {} undelivered replies", dropped));
    }
    Ok(())
}

fn prompt(ctx: &Context) -> String {
    let who = match ctx.portal.borrow().state().user() {
        Some(user) => format!("{}@{}", user.display_name(), user.role),
        None => "portal".to_string(),
    };
    let chat = ctx.chat.borrow();
    let mut draft = Vec::new();
    if !chat.draft_images().is_empty() {
        draft.push(format!("{} img", chat.draft_images().len()));
    }
    if chat.draft_location().is_some() {
        draft.push("loc".to_string());
    }
    if draft.is_empty() {
        format!("{}> ", who)
    } else {
        format!("{} [{}]> ", who, draft.join(", "))
    }
}

fn navigate(ctx: &Context, page: Page) {
    let from = ctx.portal.borrow().state().page;
    ctx.portal.borrow_mut().navigate(page);
    let _ = ctx.transcript.borrow_mut().navigate(from, page);
    show(ctx);
}

fn handle_command(ctx: &Context, cmd: &str) -> bool {
    let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
    let rest = if parts.len() > 1 { parts[1].trim() } else { "" };
    match parts[0] {
        "/exit" | "/quit" => return true,
        "/help" => {
            println!("Commands:");
            println!("  /exit                         - quit");
            println!("  /help                         - show commands");
            println!("  /session                      - show run info");
            println!("  /trace                        - toggle tracing");
            println!("Navigation:");
            println!("  /pages                        - list pages and who may open them");
            println!("  /go <page|/path>              - open a page");
            println!("  /open <n>                     - follow quick link n");
            println!("  /refresh                      - render the current page again");
            println!("Account:");
            println!("  /login <email> <role> [password]");
            println!("  /logout");
            println!("  /whoami");
            println!("  /lang [en|ml]                 - set or toggle language");
            println!("Assistant (plain text is sent to the assistant):");
            println!("  /chat <text>                  - send a message");
            println!("  /attach <image>               - attach an image to the next message");
            println!("  /detach <n>                   - remove attachment n");
            println!("  /locate [lat lon]             - attach your location");
            println!("  /history                      - show the conversation");
            println!("  /reset-chat                   - clear the conversation");
        }
        "/session" => {
            println!("Run: {}", ctx.run_id);
            println!("Transcript: {:?}", ctx.transcript.borrow().path);
            let portal = ctx.portal.borrow();
            let sessions = portal.sessions();
            println!("Storage: {}", sessions.store().path().display());
            println!("Session key: {}", sessions.key());
            println!("Reply delay: {} ms", ctx.config.chat.reply_delay_ms);
        }
        "/trace" => {
            let mut tracing = ctx.tracing.borrow_mut();
            *tracing = !*tracing;
            println!("Tracing: {}", if *tracing { "on" } else { "off" });
        }
        "/pages" => handle_pages_command(ctx),
        "/go" => {
            if rest.is_empty() {
                println!("Usage: /go <page|/path>");
            } else {
                match Page::lookup(rest.trim_matches('/')) {
                    Some(page) => navigate(ctx, page),
                    None => {
                        println!("Unknown page: {}. Showing home.", rest);
                        navigate(ctx, Page::from_path(rest));
                    }
                }
            }
        }
        "/open" => {
            let link = rest.parse::<usize>().ok().and_then(|n| {
                ctx.last_frame
                    .borrow()
                    .as_ref()
                    .and_then(|f| n.checked_sub(1).and_then(|i| f.links.get(i).copied()))
            });
            match link {
                Some(page) => navigate(ctx, page),
                None => println!("No quick link {}", rest),
            }
        }
        "/refresh" => show(ctx),
        "/login" => handle_login_command(ctx, rest),
        "/logout" => {
            ctx.portal.borrow_mut().logout();
            let _ = ctx.transcript.borrow_mut().logout();
            show(ctx);
        }
        "/whoami" => match ctx.portal.borrow().state().user() {
            Some(user) => {
                println!("{} ({})", user.email, user.role);
                println!("ID: {}", user.id);
            }
            None => println!("Not logged in"),
        },
        "/lang" => {
            let event = if rest.is_empty() {
                Event::ToggleLanguage
            } else {
                match Language::from_str(rest) {
                    Some(lang) => Event::SetLanguage(lang),
                    None => {
                        println!("Unknown language. Valid: en, ml");
                        return false;
                    }
                }
            };
            trace(ctx, "event", event.name());
            ctx.portal.borrow_mut().dispatch(event);
            let lang = ctx.portal.borrow().state().language;
            let _ = ctx.transcript.borrow_mut().language(lang.as_str());
            println!("Language: {}", lang.as_str());
            show(ctx);
        }
        "/chat" => {
            if rest.is_empty() {
                println!("Usage: /chat <text>");
            } else {
                send_chat(ctx, rest);
            }
        }
        "/attach" => handle_attach_command(ctx, rest),
        "/detach" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => match ctx.chat.borrow_mut().remove_image(n - 1) {
                Some(image) => println!("Removed {}", image.name),
                None => println!("No attachment {}", n),
            },
            _ => println!("Usage: /detach <n>"),
        },
        "/locate" => handle_locate_command(ctx, rest),
        "/history" => {
            for message in ctx.chat.borrow().messages() {
                print_chat_message(message);
            }
        }
        "/reset-chat" => {
            ctx.chat.borrow_mut().reset();
            println!("Conversation cleared");
        }
        _ => println!("Unknown command: {}", parts[0]),
    }
    false
}

fn handle_pages_command(ctx: &Context) {
    let portal = ctx.portal.borrow();
    let state = portal.state();
    let role = state.session.role();
    println!("Pages:");
    for route in gate::routes() {
        let marker = if route.page == state.page {
            "*"
        } else if route.rule.permits(role) {
            " "
        } else {
            "x"
        };
        println!(" {} {:<32} {}", marker, route.path, route.rule.describe());
    }
}

fn handle_login_command(ctx: &Context, args: &str) {
    let words = match shell_words::split(args) {
        Ok(words) => words,
        Err(e) => {
            println!("Could not parse arguments: {}", e);
            return;
        }
    };
    if words.len() < 2 {
        println!("Usage: /login <email> <role> [password]");
        println!("Roles: researcher, policymaker, conservationist, admin");
        return;
    }

    let Some(role) = Role::parse(&words[1]) else {
        println!(
            "Unknown role: {}. Valid: researcher, policymaker, conservationist, admin",
            words[1]
        );
        return;
    };
    let form = match words.get(2) {
        Some(password) => LoginForm::with_password(&words[0], password, role),
        None => LoginForm::magic_link(&words[0], role),
    };

    let result = ctx.portal.borrow_mut().login(&ctx.auth, &form);
    match result {
        Ok(user) => {
            let _ = ctx
                .transcript
                .borrow_mut()
                .login(&user.id, user.role.as_str());
            verbose(ctx, &format!("session saved as {}", user.id));
            show(ctx);
        }
        Err(e) => {
            let _ = ctx.transcript.borrow_mut().login_rejected(&e.to_string());
            println!("{}", e);
        }
    }
}

fn handle_attach_command(ctx: &Context, args: &str) {
    let words = shell_words::split(args).unwrap_or_default();
    let Some(path) = words.first() else {
        println!("Usage: /attach <image>");
        return;
    };

    let result = ctx
        .chat
        .borrow_mut()
        .attach_image(Path::new(path))
        .map(|image| format!("Attached {} ({} bytes, {})", image.name, image.size, image.digest));
    match result {
        Ok(summary) => println!("{}", summary),
        Err(e) => notify(ctx, "attachment", &e.to_string()),
    }
}

fn handle_locate_command(ctx: &Context, args: &str) {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let result = match parts.as_slice() {
        [] => ctx.chat.borrow_mut().share_location(&ctx.geolocator),
        [lat, lon] => match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Location::new(lat, lon).map(|loc| {
                ctx.chat.borrow_mut().attach_location(loc);
                loc
            }),
            _ => {
                println!("Usage: /locate [lat lon]");
                return;
            }
        },
        _ => {
            println!("Usage: /locate [lat lon]");
            return;
        }
    };

    match result {
        Ok(loc) => println!("Location attached: {}", loc),
        Err(e) => notify(ctx, "location", &e.to_string()),
    }
}

/// Transient, non-fatal message to the user
fn notify(ctx: &Context, kind: &str, message: &str) {
    println!("! {}", message);
    let _ = ctx.transcript.borrow_mut().notice(kind, message);
}

fn print_chat_message(message: &ChatMessage) {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "assistant",
    };
    let mut extras = Vec::new();
    if let Some(loc) = &message.location {
        extras.push(format!("location {}", loc));
    }
    for image in &message.images {
        extras.push(format!(
            "image {} ({}, {} byte data URL)",
            image.name,
            image.mime,
            image.data_url.len()
        ));
    }
    let time = message.timestamp.format("%H:%M");
    if extras.is_empty() {
        println!("[{}] {}: {}", time, who, message.text);
    } else {
        println!("[{}] {}: {} ({})", time, who, message.text, extras.join(", "));
    }
}

fn send_chat(ctx: &Context, text: &str) {
    let sent = ctx
        .chat
        .borrow_mut()
        .send(text, Instant::now())
        .cloned();
    let Some(sent) = sent else {
        return;
    };
    let _ = ctx.transcript.borrow_mut().chat_message(&sent);

    // Wait out the reply delay, then deliver
    let ready_at = ctx.chat.borrow().next_ready_at();
    if let Some(ready_at) = ready_at {
        if ctx.chat.borrow().is_typing() {
            println!("assistant is typing...");
        }
        let now = Instant::now();
        if ready_at > now {
            std::thread::sleep(ready_at - now);
        }
    }
    let delivered = ctx.chat.borrow_mut().poll(Instant::now());
    for message in delivered {
        let _ = ctx.transcript.borrow_mut().chat_message(&message);
        print_chat_message(&message);
    }
}
