//! Flow command handlers.

use std::sync::Arc;

use bytes::Bytes;
use tabled::Tabled;

use flowdeck_core::{
    CommandResult, ControllerConfig, Flow, FlowCommand, FlowController, FlowId, SessionView,
};

use crate::cli::{FlowListArgs, FlowsArgs, FlowsCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

/// Characters of a flow ID shown in tables.
const SHORT_ID_LEN: usize = 8;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FlowRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

impl FlowRow {
    fn new(f: &Flow, color: bool) -> Self {
        let id = f.id.to_string();
        Self {
            id: id.chars().take(SHORT_ID_LEN).collect(),
            method: f.method().unwrap_or(f.kind.into()).to_owned(),
            host: f
                .host()
                .map(str::to_owned)
                .or_else(|| f.client_addr.clone())
                .unwrap_or_else(|| "-".into()),
            path: f.path().unwrap_or("-").to_owned(),
            status: if f.error.is_some() {
                output::dim("error", color)
            } else {
                output::paint_status(f.status_code(), color)
            },
            size: f.total_size().map_or_else(|| "-".into(), human_size),
            time: f.duration().map_or_else(|| "-".into(), |d| format!("{}ms", d.num_milliseconds())),
            flags: flags(f),
        }
    }
}

/// Compact state markers: `i` intercepted, `m` modified, `*` marked.
fn flags(f: &Flow) -> String {
    let mut out = String::new();
    if f.intercepted {
        out.push('i');
    }
    if f.modified {
        out.push('m');
    }
    if f.is_marked() {
        out.push('*');
    }
    out
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1}{unit}")
}

fn detail(f: &Flow) -> String {
    let mut lines = vec![
        format!("ID:        {}", f.id),
        format!("Kind:      {}", f.kind),
        format!("Client:    {}", f.client_addr.as_deref().unwrap_or("-")),
    ];
    if let Some(ref req) = f.request {
        lines.push(format!("Request:   {} {}", req.method, req.url()));
        lines.push(format!("Version:   {}", req.http_version));
    }
    if let Some(ref resp) = f.response {
        lines.push(format!("Status:    {} {}", resp.status_code, resp.reason).trim_end().to_owned());
    }
    if let Some(size) = f.total_size() {
        lines.push(format!("Size:      {}", human_size(size)));
    }
    if let Some(d) = f.duration() {
        lines.push(format!("Duration:  {}ms", d.num_milliseconds()));
    }
    if let Some(at) = f.created_at {
        lines.push(format!("Created:   {}", at.to_rfc3339()));
    }
    if let Some(ref mark) = f.marked {
        lines.push(format!("Marked:    {mark}"));
    }
    lines.push(format!("Intercept: {}", if f.intercepted { "yes" } else { "no" }));
    lines.push(format!("Modified:  {}", if f.modified { "yes" } else { "no" }));
    if let Some(ref err) = f.error {
        lines.push(format!("Error:     {err}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    mut config: ControllerConfig,
    args: FlowsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    scope_config(&mut config, &args.command);

    let controller = FlowController::new(config)?;
    controller.start().await?;
    let result = run(&controller, args.command, global).await;
    controller.shutdown().await;
    result
}

/// Only `list` honours the profile's default filter; id lookups must see
/// every flow.
fn scope_config(config: &mut ControllerConfig, cmd: &FlowsCommand) {
    match cmd {
        FlowsCommand::List(list) => apply_list_args(config, list),
        _ => config.filter = None,
    }
}

fn apply_list_args(config: &mut ControllerConfig, list: &FlowListArgs) {
    if let Some(ref filter) = list.filter {
        config.filter = Some(filter.clone()).filter(|f| !f.trim().is_empty());
    }
    if let Some(column) = list.sort {
        config.sort = Some(column);
        config.descending = list.desc;
    } else if list.desc {
        config.descending = true;
    }
}

#[allow(clippy::too_many_lines)]
async fn run(controller: &FlowController, cmd: FlowsCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        FlowsCommand::List(list) => {
            let view = controller.wait_synced().await?;
            let shown: Vec<Arc<Flow>> = view
                .items
                .iter()
                .take(list.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect();
            let color = output::should_color(global.color);
            let out = output::render_list(
                global.output,
                &shown,
                |f| FlowRow::new(f, color),
                |f| f.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            if global.output == OutputFormat::Table && !global.quiet {
                eprintln!("{}", output::dim(&footer(&view, shown.len()), color));
            }
            Ok(())
        }

        FlowsCommand::Get { id } => {
            let view = controller.wait_synced().await?;
            let flow = util::resolve_flow(&view, &id)?;
            let out = output::render_single(global.output, flow.as_ref(), detail, |f| f.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FlowsCommand::Accept { id } => {
            let id = resolve_id(controller, &id).await?;
            controller.execute(FlowCommand::Accept { id: id.clone() }).await?;
            done(global, &format!("Flow {id} resumed"));
            Ok(())
        }

        FlowsCommand::Delete { id } => {
            let id = resolve_id(controller, &id).await?;
            if !util::confirm(&format!("Delete flow {id}?"), "delete", global.yes)? {
                return Ok(());
            }
            controller.execute(FlowCommand::Delete { id: id.clone() }).await?;
            done(global, &format!("Flow {id} deleted"));
            Ok(())
        }

        FlowsCommand::Duplicate { id } => {
            let id = resolve_id(controller, &id).await?;
            controller.execute(FlowCommand::Duplicate { id: id.clone() }).await?;
            done(global, &format!("Flow {id} duplicated"));
            Ok(())
        }

        FlowsCommand::Replay { id } => {
            let id = resolve_id(controller, &id).await?;
            controller.execute(FlowCommand::Replay { id: id.clone() }).await?;
            done(global, &format!("Flow {id} replayed"));
            Ok(())
        }

        FlowsCommand::Revert { id } => {
            let id = resolve_id(controller, &id).await?;
            controller.execute(FlowCommand::Revert { id: id.clone() }).await?;
            done(global, &format!("Flow {id} reverted"));
            Ok(())
        }

        FlowsCommand::Update { id, from_file } => {
            let data = util::read_json_file(&from_file)?;
            let id = resolve_id(controller, &id).await?;
            controller.execute(FlowCommand::Update { id: id.clone(), data }).await?;
            done(global, &format!("Flow {id} updated"));
            Ok(())
        }

        FlowsCommand::AcceptAll => {
            controller.execute(FlowCommand::AcceptAll).await?;
            done(global, "All intercepted flows resumed");
            Ok(())
        }

        FlowsCommand::Clear => {
            if !util::confirm("Remove every flow from the server?", "clear", global.yes)? {
                return Ok(());
            }
            controller.execute(FlowCommand::Clear).await?;
            done(global, "All flows cleared");
            Ok(())
        }

        FlowsCommand::Download { output_file } => {
            let CommandResult::Dump(dump) = controller.execute(FlowCommand::Download).await? else {
                return Err(CliError::Internal("server returned no dump".into()));
            };
            std::fs::write(&output_file, &dump)?;
            done(
                global,
                &format!("Wrote {} to {}", human_size(u64::try_from(dump.len()).unwrap_or(u64::MAX)), output_file.display()),
            );
            Ok(())
        }

        FlowsCommand::Upload { file } => {
            let dump = Bytes::from(std::fs::read(&file)?);
            controller.execute(FlowCommand::Upload { dump }).await?;
            done(global, &format!("Uploaded {}", file.display()));
            Ok(())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

async fn resolve_id(controller: &FlowController, identifier: &str) -> Result<FlowId, CliError> {
    let view = controller.wait_synced().await?;
    Ok(util::resolve_flow(&view, identifier)?.id.clone())
}

fn done(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}

fn footer(view: &SessionView<Flow>, shown: usize) -> String {
    let mut line = format!("{shown} of {} flows", view.total);
    if let Some(ref filter) = view.filter {
        line.push_str(&format!(" (filter: {filter})"));
    }
    if let Some(ref sort) = view.sorter {
        let dir = if sort.descending { "desc" } else { "asc" };
        line.push_str(&format!(" (sort: {} {dir})", sort.column));
    }
    line
}
