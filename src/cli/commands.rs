//! Command handlers for the CLI
//!
//! Thin glue over the library: resolve branches, list, prompt, schedule and
//! print one line per result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::args::{ConfigAction, LaunchArgs, ListArgs, UpdateArgs};
use super::prompt;
use crate::app::environment::{Environment, ProjectKey};
use crate::app::history::{History, LaunchRecord};
use crate::app::locate::{self, LocalItem};
use crate::app::scheduler::TaskScheduler;
use crate::app::settings::UpdateSettings;
use crate::app::task::{FetchTask, Task, TaskResult};
use crate::app::updater::Updater;
use crate::config::AppPaths;
use crate::constants::{exit_codes, launch};
use crate::errors::{AppError, Result};

/// Loaded configuration shared by the command handlers
#[derive(Debug)]
pub struct AppContext {
    pub paths: AppPaths,
    pub env: Environment,
    pub settings: UpdateSettings,
    pub quiet: bool,
}

impl AppContext {
    /// Initialize the state directory and load the configuration documents
    pub async fn load(paths: AppPaths, explicit: Option<&Path>, quiet: bool) -> Result<Self> {
        if let Some(path) = paths.initialize_first_run().await? {
            info!("Wrote default configuration to {}", path.display());
        }
        let documents = paths.document_paths(explicit).await?;
        debug!("Configuration documents: {:?}", documents);

        let env = Environment::load(&documents).await?;
        let settings = UpdateSettings::from_environment(&env)?;
        debug!("Settings: {:?}", settings);
        Ok(Self {
            paths,
            env,
            settings,
            quiet,
        })
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style.tick_strings(&["◐", "◓", "◑", "◒"]));
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

/// Fetch new builds and/or patches
pub async fn handle_update(ctx: &AppContext, args: UpdateArgs) -> Result<()> {
    let mut projects = Vec::new();
    if args.wants_builds() {
        projects.push(ProjectKey::Nx);
    }
    if args.wants_patches() {
        projects.push(ProjectKey::Tmg);
    }

    let mut tasks = Vec::new();
    for project in projects {
        match collect_tasks(ctx, project, &args.version, args.all).await {
            Ok(mut project_tasks) => tasks.append(&mut project_tasks),
            Err(e) => {
                warn!("Skipping {} update: {}", project, e);
                println!("{}", e);
            }
        }
    }

    if tasks.is_empty() {
        println!("Not fetching anything.");
        return Ok(());
    }

    let items: HashMap<String, String> = tasks
        .iter()
        .map(|task| (task.id().to_string(), task.item().to_string()))
        .collect();
    let names: Vec<&str> = tasks.iter().map(FetchTask::item).collect();
    println!("Fetching: {}", names.join(", "));

    let scheduler = if args.sync {
        TaskScheduler::sequential()
    } else {
        TaskScheduler::default()
    };
    let total = tasks.len();
    let spinner = ctx.spinner(format!("0/{} done", total));
    let mut results = scheduler.submit(tasks);

    let mut done = 0;
    let mut failed = 0;
    while let Some(result) = results.next_result().await {
        done += 1;
        if !result.is_success() {
            failed += 1;
        }
        let item = items.get(&result.id).map(String::as_str).unwrap_or(&result.id);
        spinner.suspend(|| echo_result(&result, item));
        spinner.set_message(format!("{}/{} done", done, total));
    }
    spinner.finish_and_clear();

    info!("Update finished: {} fetched, {} failed", done - failed, failed);
    Ok(())
}

fn echo_result(result: &TaskResult, item: &str) {
    if result.is_success() {
        println!("Fetched {}.", item);
        return;
    }
    println!("Error fetching {}.", item);
    if let Some(reason) = &result.reason {
        println!("{}", reason);
    }
}

async fn collect_tasks(
    ctx: &AppContext,
    project: ProjectKey,
    version: &str,
    all: bool,
) -> Result<Vec<FetchTask>> {
    let branch = ctx.env.get_branch(project, version)?;
    if !branch.is_tracked() {
        println!(
            "Branch {} of project {} is {}. Skipping",
            version, project, branch.status
        );
        return Ok(Vec::new());
    }

    let mut updater = Updater::for_branch(project, branch, &ctx.settings)?;
    let spinner = ctx.spinner(format!("Checking for new {} items...", project.artifact()));
    let listed = updater.list_new().await;
    spinner.finish_and_clear();
    let new_items = listed?.to_vec();

    let indices = match new_items.len() {
        0 => {
            println!("No new {} items.", project.artifact());
            return Ok(Vec::new());
        }
        count if all => (0..count).collect(),
        1 => {
            println!("One new {} item found.\n{}", project.artifact(), new_items[0]);
            if prompt::confirm("Get this item?", true)? {
                vec![0]
            } else {
                Vec::new()
            }
        }
        count => {
            println!("{} new {} items found.", count, project.artifact());
            prompt::prompt_indices(&new_items, "Pick items.")?
        }
    };

    Ok(updater.make_tasks(&indices).await?)
}

/// Map "new build" / "new patch" onto the scheduled-check exit codes
pub fn check_exit_code(new_build: bool, new_patch: bool) -> i32 {
    match (new_build, new_patch) {
        (false, false) => exit_codes::NOTHING_NEW,
        (true, false) => exit_codes::NEW_BUILD,
        (false, true) => exit_codes::NEW_PATCH,
        (true, true) => exit_codes::NEW_BOTH,
    }
}

/// Report whether new items exist through the returned exit code
pub async fn handle_check(ctx: &AppContext, version: &str) -> i32 {
    let new_build = has_new_items(ctx, ProjectKey::Nx, version).await;
    let new_patch = has_new_items(ctx, ProjectKey::Tmg, version).await;
    info!("Check {}: new build {}, new patch {}", version, new_build, new_patch);
    check_exit_code(new_build, new_patch)
}

async fn has_new_items(ctx: &AppContext, project: ProjectKey, version: &str) -> bool {
    match list_new_items(ctx, project, version).await {
        Ok(new_items) => {
            for item in &new_items {
                println!("New {}: {}", project.artifact(), item);
            }
            !new_items.is_empty()
        }
        Err(e) => {
            warn!("Could not check {}: {}", project, e);
            println!("{}", e);
            false
        }
    }
}

async fn list_new_items(ctx: &AppContext, project: ProjectKey, version: &str) -> Result<Vec<String>> {
    let branch = ctx.env.get_branch(project, version)?;
    if !branch.is_tracked() {
        return Ok(Vec::new());
    }
    let mut updater = Updater::for_branch(project, branch, &ctx.settings)?;
    Ok(updater.list_new().await?.to_vec())
}

fn format_local_items(items: &[LocalItem], absolute: bool) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. {} -- created: {}",
                i,
                item.display_name(absolute),
                item.modified.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn local_items(root: &Path) -> Result<Vec<LocalItem>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || locate::list_directories(&root))
        .await
        .map_err(|e| AppError::generic(format!("Directory listing failed: {}", e)))?
        .map_err(AppError::Io)
}

/// List local builds and patches, newest first
pub async fn handle_list(ctx: &AppContext, args: ListArgs) -> Result<()> {
    let show_builds = args.build || !args.patch;
    let show_patches = args.patch || !args.build;

    if show_builds {
        let branch = ctx.env.get_branch(ProjectKey::Nx, &args.version)?;
        match &branch.local {
            _ if branch.is_frozen() => println!("Frozen build."),
            Some(root) => {
                println!("List of builds:");
                println!("{}", format_local_items(&local_items(root).await?, args.absolute));
            }
            None => println!("No local builds configured."),
        }
    }

    if show_patches {
        let branch = ctx.env.get_branch(ProjectKey::Tmg, &args.version)?;
        println!("List of patches:");
        if let Some(root) = &branch.local {
            println!("{}", format_local_items(&local_items(root).await?, args.absolute));
        }
    }
    Ok(())
}

async fn pick_local(root: &Path, latest: bool, message: &str) -> Result<PathBuf> {
    let items = local_items(root).await?;
    if items.is_empty() {
        return Err(AppError::generic(format!("Nothing found in {}", root.display())));
    }
    if latest {
        return Ok(items[0].path.clone());
    }
    let names: Vec<String> = items.iter().map(|item| item.display_name(false)).collect();
    let index = prompt::prompt_index(&names, message)?;
    Ok(items[index].path.clone())
}

async fn find_blocking<F>(root: PathBuf, find: F, what: &str) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Option<PathBuf> + Send + 'static,
{
    let searched = root.clone();
    tokio::task::spawn_blocking(move || find(&root))
        .await
        .map_err(|e| AppError::generic(format!("Search failed: {}", e)))?
        .ok_or_else(|| AppError::generic(format!("Could not find {} in {}", what, searched.display())))
}

/// How the launched process gets its TMG installation
#[derive(Debug, Clone, PartialEq, Eq)]
enum TmgChoice {
    /// Use the build's bundled TMG
    Vanilla,
    /// Leave the user's environment untouched
    Inherit(Option<String>),
    /// Point NX at this installation
    Install(PathBuf),
}

/// Launch NX and record the launch
pub async fn handle_launch(ctx: &AppContext, args: LaunchArgs) -> Result<()> {
    let working_dir = if args.cwd {
        std::env::current_dir()?
    } else {
        match ctx.settings.start_in.as_deref() {
            Some(dir) if dir.is_dir() => dir.to_path_buf(),
            configured => {
                let fallback = std::env::current_dir()?;
                if configured.is_some() {
                    println!(
                        "Working directory defined in configuration \"start_in\" does not exist.\nWill start in {}.",
                        fallback.display()
                    );
                }
                fallback
            }
        }
    };

    let nx_branch = ctx.env.get_branch(ProjectKey::Nx, &args.version)?;
    let (ugraf, build_label) = match (&nx_branch.remote, &nx_branch.local) {
        (Some(remote), _) if nx_branch.is_frozen() => {
            println!("Frozen NX branch.");
            (PathBuf::from(remote), remote.clone())
        }
        (_, Some(local)) => {
            let build = pick_local(local, args.latest, "Pick an NX build.").await?;
            let ugraf = find_blocking(build.clone(), locate::find_ugraf, launch::UGRAF_EXE).await?;
            (ugraf, build.display().to_string())
        }
        _ => return Err(AppError::generic("NX branch has no builds")),
    };

    let tmg = if args.vanilla {
        TmgChoice::Vanilla
    } else if args.env_var {
        let current = std::env::var(launch::TMG_ENV_VAR).ok();
        println!(
            "Not setting {}. Currently set to: {}",
            launch::TMG_ENV_VAR,
            current.as_deref().unwrap_or("")
        );
        TmgChoice::Inherit(current)
    } else {
        let tmg_version = args.tmg.as_deref().unwrap_or(&args.version);
        let tmg_branch = ctx.env.get_branch(ProjectKey::Tmg, tmg_version)?;
        let local = tmg_branch
            .local
            .as_deref()
            .ok_or_else(|| AppError::generic("TMG branch has no patches"))?;
        let patch = pick_local(local, args.latest, "Pick a TMG patch.").await?;
        TmgChoice::Install(find_blocking(patch, locate::find_tmg, "a TMG installation").await?)
    };

    let mut command = std::process::Command::new(&ugraf);
    command.current_dir(&working_dir);
    let patch_label = match &tmg {
        TmgChoice::Vanilla => {
            command.env_remove(launch::TMG_ENV_VAR);
            String::new()
        }
        TmgChoice::Inherit(current) => current.clone().unwrap_or_default(),
        TmgChoice::Install(dir) => {
            println!("Setting {} to: {}", launch::TMG_ENV_VAR, dir.display());
            command.env(launch::TMG_ENV_VAR, dir);
            dir.display().to_string()
        }
    };

    debug!("Launch command: {:?}", command);
    let child = command.spawn().map_err(|e| {
        AppError::generic(format!("Could not launch {}: {}", ugraf.display(), e))
    })?;
    println!("Launched {} (PID {}).", ugraf.display(), child.id());

    let history_path = ctx.paths.history();
    let mut history = History::load(&history_path).await?;
    history.push(LaunchRecord {
        pid: child.id(),
        nx_version: args.version.clone(),
        build: build_label,
        patch: patch_label,
    });
    history.save(&history_path).await?;
    Ok(())
}

/// Print recorded launches, newest first
pub async fn handle_history(paths: &AppPaths) -> Result<()> {
    let history = History::load(&paths.history()).await?;
    if history.is_empty() {
        println!("No launches recorded.");
        return Ok(());
    }
    for (slot, record) in history.newest_first() {
        println!("{}. {} (PID {})", slot, record.nx_version, record.pid);
        println!("   build: {}", record.build);
        if !record.patch.is_empty() {
            println!("   patch: {}", record.patch);
        }
    }
    Ok(())
}

/// Last component of a recorded path, for either separator
fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn format_entry(record: &LaunchRecord) -> String {
    format!(
        "BUILD: {}\nPATCH: {}\nNX VERSION: {}",
        basename(&record.build),
        basename(&record.patch),
        record.nx_version
    )
}

/// Print the launch record of process `pid`
pub async fn handle_find_entry(paths: &AppPaths, pid: u32) -> Result<()> {
    let history = History::load(&paths.history()).await?;
    match history.find_pid(pid) {
        Some(record) => println!("{}", format_entry(record)),
        None => println!("Could not find entry with PID {}", pid),
    }
    Ok(())
}

/// Show, locate or reset configuration
pub async fn handle_config(
    paths: AppPaths,
    explicit: Option<&Path>,
    quiet: bool,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let ctx = AppContext::load(paths, explicit, quiet).await?;
            let text = serde_json::to_string_pretty(&ctx.env)
                .map_err(|e| AppError::generic(format!("Could not format configuration: {}", e)))?;
            println!("{}", text);
        }
        ConfigAction::Path => {
            println!("Defaults: {}", paths.default_config().display());
            let user = explicit.map(Path::to_path_buf).unwrap_or_else(|| paths.user_config());
            println!("User:     {}", user.display());
            println!("History:  {}", paths.history().display());
        }
        ConfigAction::Reset => {
            paths.initialize_first_run().await?;
            if let Some(backup) = paths.reset_user_config().await? {
                println!("Previous configuration saved to {}", backup.display());
            }
            println!("Reset {}", paths.user_config().display());
        }
    }
    Ok(())
}
