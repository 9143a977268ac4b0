//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::ObiConfig;
use chrono::NaiveDate;
use obi_core::{
    AcademyId, BeltSlug, ClassId, EligibilityResult, Engine, GraduationFilter, GraduationId,
    GraduationRecord, GraduationRule, GraduationStatus, MemberId, NewGraduation, ObiError, Rank,
    Snapshot, today,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum snapshot file size for ingestion (100 MB).
const MAX_INGEST_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ObiError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ObiError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ObiError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ObiError> {
    let canonical = path.canonicalize().map_err(|e| {
        ObiError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ObiError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub backend: String,
    pub config: Option<PathBuf>,
    pub json_mode: bool,
}

/// Open an engine for the configured backend.
///
/// Configured templates seed an in-memory engine on every open. A redb
/// database is seeded once by `init`, so templates edited with
/// `rules set` are never overwritten by the config file.
pub fn open_engine(ctx: &Context) -> Result<Engine, ObiError> {
    let config = ObiConfig::load(ctx.config.as_deref())?;
    let mut engine = open_backend(ctx, &config)?;
    if !engine.is_persistent() {
        seed_templates(&config, &mut engine)?;
    }
    Ok(engine)
}

fn open_backend(ctx: &Context, config: &ObiConfig) -> Result<Engine, ObiError> {
    let ladder = config.ladder()?;

    match ctx.backend.as_str() {
        "redb" => Engine::with_redb(&ctx.database, ladder),
        "memory" => Ok(Engine::in_memory(ladder)),
        other => Err(ObiError::InvalidInput(format!(
            "unknown backend '{}' (expected redb or memory)",
            other
        ))),
    }
}

fn seed_templates(config: &ObiConfig, engine: &mut Engine) -> Result<(), ObiError> {
    let templates = config.apply_templates(engine)?;
    if templates > 0 {
        tracing::debug!(templates, "rule templates applied from configuration");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

/// Tenths of a class per week as `x.y`.
fn tenths(value: u32) -> String {
    format!("{}.{}", value / 10, value % 10)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(ctx: &Context, host: &str, port: u16) -> Result<(), ObiError> {
    let engine = open_engine(ctx)?;

    println!("Obi Graduation Engine Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", ctx.backend);
    println!("  Database: {:?}", ctx.database);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, engine).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), ObiError> {
    if ctx.backend == "redb" && ctx.database.exists() {
        if !force {
            return Err(ObiError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| ObiError::IoError(format!("Remove database: {}", e)))?;
    }

    let config = ObiConfig::load(ctx.config.as_deref())?;
    let mut engine = open_backend(ctx, &config)?;
    seed_templates(&config, &mut engine)?;
    let belts = engine.belts().len();

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.database.to_string_lossy(),
            "backend": ctx.backend,
            "belts": belts,
        }));
    } else {
        println!(
            "Initialized new {} database at {:?} ({} belts)",
            ctx.backend, ctx.database, belts
        );
    }
    Ok(())
}

// =============================================================================
// INGEST COMMAND
// =============================================================================

/// Mirror a collaborator snapshot from a JSON file.
pub fn cmd_ingest(ctx: &Context, file: &Path) -> Result<(), ObiError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_INGEST_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| ObiError::IoError(format!("Read file: {}", e)))?;
    let snapshot: Snapshot = serde_json::from_slice(&data)
        .map_err(|e| ObiError::SerializationError(format!("Parse snapshot: {}", e)))?;

    let mut engine = open_engine(ctx)?;
    let summary = engine.ingest(&snapshot)?;

    if ctx.json_mode {
        print_json(&summary);
        return Ok(());
    }

    println!("Ingested snapshot from {:?}", validated_path);
    println!("  Members:      {}", summary.members);
    println!("  Enrollments:  {}", summary.enrollments);
    println!("  Attendance:   {}", summary.attendance);
    println!(
        "  Ranks seeded: {} ({} skipped, already ranked)",
        summary.ranks_seeded, summary.ranks_skipped
    );
    Ok(())
}

// =============================================================================
// EVALUATE / SCAN COMMANDS
// =============================================================================

fn print_result(result: &EligibilityResult) {
    let m = &result.metrics;
    println!(
        "Member {} ({}) at academy {}",
        result.member, result.member_name, result.academy
    );
    println!("  Current:  {}", result.current);
    println!("  Target:   {} ({:?})", result.target, result.target_kind);
    println!(
        "  Status:   {:?} {}%",
        result.status, result.progress_percent
    );
    println!("  Rule:     {:?}", result.rule_source);
    println!(
        "  Classes since degree: {} / {}",
        m.classes_since_degree, m.classes_per_degree
    );
    println!(
        "  Classes since belt:   {} / {}",
        m.classes_since_belt, m.min_classes
    );
    println!(
        "  Months in belt:       {} / {}",
        m.months_in_belt, m.target_months
    );
    match m.target_weekly_frequency_tenths {
        Some(target) => println!(
            "  Weekly frequency:     {} (target {})",
            tenths(m.weekly_frequency_tenths),
            tenths(target)
        ),
        None => println!(
            "  Weekly frequency:     {}",
            tenths(m.weekly_frequency_tenths)
        ),
    }
    for reason in &result.reasons {
        println!("  - {}", reason);
    }
}

/// Evaluate one member.
pub fn cmd_evaluate(
    ctx: &Context,
    academy: u64,
    member: u64,
    as_of: Option<NaiveDate>,
) -> Result<(), ObiError> {
    let engine = open_engine(ctx)?;
    let result = engine.evaluate_member_at(
        MemberId(member),
        AcademyId(academy),
        as_of.unwrap_or_else(today),
    )?;

    if ctx.json_mode {
        print_json(&result);
    } else {
        print_result(&result);
    }
    Ok(())
}

/// Scan an academy's roster.
pub fn cmd_scan(ctx: &Context, academy: u64, as_of: Option<NaiveDate>) -> Result<(), ObiError> {
    let engine = open_engine(ctx)?;
    let as_of = as_of.unwrap_or_else(today);
    let results = engine.scan_roster_at(AcademyId(academy), as_of)?;

    if ctx.json_mode {
        print_json(&results);
        return Ok(());
    }

    println!(
        "Academy {}: {} member(s) ready or approaching as of {}",
        academy,
        results.len(),
        as_of
    );
    for result in &results {
        println!(
            "  {:>6}  {:<24} {:>10} -> {:<10} {:?} {}%",
            result.member,
            result.member_name,
            result.current.to_string(),
            result.target.to_string(),
            result.status,
            result.progress_percent
        );
    }
    Ok(())
}

// =============================================================================
// GRADUATION COMMANDS
// =============================================================================

/// Arguments of `obi graduate`.
#[derive(Debug, Clone)]
pub struct GraduateArgs {
    pub academy: u64,
    pub member: u64,
    pub belt: String,
    pub degree: u8,
    pub granted_by: u64,
    pub date: Option<NaiveDate>,
    pub class: Option<u64>,
    pub notes: Option<String>,
    pub pending: bool,
    pub manual: bool,
    pub justification: Option<String>,
}

fn print_record(record: &GraduationRecord) {
    let previous = record
        .previous
        .as_ref()
        .map_or_else(|| "-".to_string(), Rank::to_string);
    println!(
        "  #{:<6} {}  member {:<6} {:>10} -> {:<10} {}{}",
        record.id,
        record.decided_on,
        record.member,
        previous,
        record.target.to_string(),
        record.status,
        if record.manual { " (manual)" } else { "" }
    );
}

/// Record a graduation.
pub fn cmd_graduate(ctx: &Context, args: GraduateArgs) -> Result<(), ObiError> {
    let mut engine = open_engine(ctx)?;
    let record = engine.create_graduation(NewGraduation {
        member: MemberId(args.member),
        academy: AcademyId(args.academy),
        previous: None,
        target: Rank::new(args.belt.as_str(), args.degree),
        decided_on: args.date.unwrap_or_else(today),
        granted_by: MemberId(args.granted_by),
        class: args.class.map(ClassId),
        notes: args.notes,
        pending: args.pending,
        manual: args.manual,
        justification: args.justification,
    })?;

    if ctx.json_mode {
        print_json(&record);
    } else {
        println!("Graduation recorded:");
        print_record(&record);
    }
    Ok(())
}

/// Confirm a pending graduation.
pub fn cmd_confirm(ctx: &Context, id: u64) -> Result<(), ObiError> {
    let mut engine = open_engine(ctx)?;
    let record = engine.confirm_graduation(GraduationId(id))?;

    if ctx.json_mode {
        print_json(&record);
    } else {
        println!("Graduation confirmed:");
        print_record(&record);
    }
    Ok(())
}

/// Cancel a graduation. The member's rank is left unchanged.
pub fn cmd_cancel(ctx: &Context, id: u64) -> Result<(), ObiError> {
    let mut engine = open_engine(ctx)?;
    engine.cancel_graduation(GraduationId(id))?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "id": id,
            "status": GraduationStatus::Cancelled,
        }));
    } else {
        println!("Graduation #{} cancelled", id);
    }
    Ok(())
}

/// Show an academy's graduation history.
pub fn cmd_history(
    ctx: &Context,
    academy: u64,
    member: Option<u64>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    status: Option<&str>,
) -> Result<(), ObiError> {
    let filter = GraduationFilter {
        member: member.map(MemberId),
        from,
        to,
        status: status.map(GraduationStatus::parse).transpose()?,
    };

    let engine = open_engine(ctx)?;
    let records = engine.list_graduations(AcademyId(academy), &filter)?;

    if ctx.json_mode {
        print_json(&records);
        return Ok(());
    }

    println!("Academy {}: {} graduation(s)", academy, records.len());
    for record in &records {
        print_record(record);
    }
    Ok(())
}

// =============================================================================
// RULE COMMANDS
// =============================================================================

/// Effective rule for every belt.
pub fn cmd_rules_list(ctx: &Context, academy: u64) -> Result<(), ObiError> {
    let engine = open_engine(ctx)?;
    let rules = engine.list_rules(AcademyId(academy))?;

    if ctx.json_mode {
        print_json(&rules);
        return Ok(());
    }

    println!("Rules for academy {}", academy);
    for view in &rules {
        println!(
            "  {:<12} classes {:>4}  months {:>3}  per degree {:>4}  ({:?})",
            view.belt.as_str(),
            view.rule.min_classes,
            view.rule.min_months,
            view.rule.classes_per_degree,
            view.source
        );
    }
    Ok(())
}

/// Set an academy rule, or the default template when `academy` is `None`.
pub fn cmd_rules_set(
    ctx: &Context,
    academy: Option<u64>,
    belt: &str,
    rule: GraduationRule,
) -> Result<(), ObiError> {
    let mut engine = open_engine(ctx)?;
    let slug = BeltSlug::new(belt);

    match academy {
        Some(academy) => engine.upsert_rule(AcademyId(academy), &slug, rule)?,
        None => engine.set_template_rule(&slug, rule)?,
    }

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "academy": academy,
            "belt": slug,
            "rule": rule,
        }));
    } else {
        match academy {
            Some(academy) => println!("Rule for {} set at academy {}", slug, academy),
            None => println!("Default template for {} set", slug),
        }
    }
    Ok(())
}

/// Replace an academy's rules with the default templates.
pub fn cmd_rules_reset(ctx: &Context, academy: u64) -> Result<(), ObiError> {
    let mut engine = open_engine(ctx)?;
    let copied = engine.reset_rules(AcademyId(academy))?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "academy": academy, "copied": copied }));
    } else {
        println!(
            "Academy {} rules reset: {} template(s) copied",
            academy, copied
        );
    }
    Ok(())
}

// =============================================================================
// BELTS COMMAND
// =============================================================================

/// Show the belt ladder.
pub fn cmd_belts(ctx: &Context, regular: bool) -> Result<(), ObiError> {
    let engine = open_engine(ctx)?;
    let belts = if regular {
        engine.regular_belts()
    } else {
        engine.belts()
    };

    if ctx.json_mode {
        print_json(&belts);
        return Ok(());
    }

    println!("Belt ladder");
    println!("===========");
    for belt in belts {
        println!(
            "  {:>2}. {:<12} {:<24} {:?}, degrees 0..={}",
            belt.order,
            belt.slug.as_str(),
            belt.name,
            belt.category,
            belt.max_degree
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(database: PathBuf, backend: &str) -> Context {
        Context {
            database,
            backend: backend.to_string(),
            config: None,
            json_mode: true,
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let ctx = context(PathBuf::from("unused"), "file");
        assert!(matches!(open_engine(&ctx), Err(ObiError::InvalidInput(_))));
    }

    #[test]
    fn init_refuses_existing_database() {
        let temp = tempdir().expect("temp dir");
        let ctx = context(temp.path().join("obi.redb"), "redb");
        cmd_init(&ctx, false).expect("first init");
        assert!(cmd_init(&ctx, false).is_err());
        cmd_init(&ctx, true).expect("forced init");
    }

    #[test]
    fn rules_set_persists_across_opens() {
        let temp = tempdir().expect("temp dir");
        let ctx = context(temp.path().join("obi.redb"), "redb");
        cmd_rules_set(&ctx, Some(3), "blue", GraduationRule::new(150, 18, 35)).expect("set");

        let engine = open_engine(&ctx).expect("open");
        let rules = engine.list_rules(AcademyId(3)).expect("rules");
        let blue = rules
            .iter()
            .find(|v| v.belt.as_str() == "blue")
            .expect("blue row");
        assert_eq!(blue.rule.classes_per_degree, 35);
    }

    #[test]
    fn config_templates_seed_only_on_init() {
        let temp = tempdir().expect("temp dir");
        let config = temp.path().join("obi.toml");
        std::fs::write(
            &config,
            "[[templates]]\nbelt = \"white\"\nmin_classes = 120\nmin_months = 12\nclasses_per_degree = 30\n",
        )
        .expect("write");
        let ctx = Context {
            config: Some(config),
            ..context(temp.path().join("obi.redb"), "redb")
        };

        cmd_init(&ctx, false).expect("init");
        let white = |engine: &Engine| {
            engine
                .list_rules(AcademyId(1))
                .expect("rules")
                .into_iter()
                .find(|v| v.belt.as_str() == "white")
                .expect("white row")
                .rule
        };
        assert_eq!(white(&open_engine(&ctx).expect("open")).classes_per_degree, 30);

        cmd_rules_set(&ctx, None, "white", GraduationRule::new(100, 10, 20)).expect("set");
        assert_eq!(
            white(&open_engine(&ctx).expect("reopen")),
            GraduationRule::new(100, 10, 20)
        );
    }

    #[test]
    fn ingest_reads_snapshot_file() {
        let temp = tempdir().expect("temp dir");
        let file = temp.path().join("snapshot.json");
        std::fs::write(
            &file,
            r#"{"members":[{"id":1,"name":"Ana"}],"ranks":[{"member":1,"rank":{"belt":"white","degree":0}}]}"#,
        )
        .expect("write");

        let ctx = context(temp.path().join("obi.redb"), "redb");
        cmd_ingest(&ctx, &file).expect("ingest");

        let engine = open_engine(&ctx).expect("open");
        assert_eq!(
            engine.current_rank(MemberId(1)).expect("rank"),
            Some(Rank::new("white", 0))
        );
    }

    #[test]
    fn tenths_format() {
        assert_eq!(tenths(15), "1.5");
        assert_eq!(tenths(0), "0.0");
    }
}
