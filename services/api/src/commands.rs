use crate::infra::load_catalog;
use clap::Args;
use prospectus::error::AppError;
use prospectus::personalisation::{
    seed_for, seeded_suggestion, validate_profile, HouseOption, SchoolCatalog, SchoolId,
    VisibilityResult,
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ResolveArgs {
    /// School identifier, e.g. `clc` or `strathallan`
    #[arg(long)]
    pub(crate) school: String,
    /// JSON file holding the enquiry-form submission
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Load school configuration from this directory instead of the built-in schools
    #[arg(long)]
    pub(crate) schools_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CheckArgs {
    /// Directory of school JSON documents; the built-in schools are checked when omitted
    #[arg(long)]
    pub(crate) schools_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResolveReport {
    pub(crate) school: SchoolId,
    pub(crate) child_name: String,
    pub(crate) entry_point: String,
    #[serde(flatten)]
    pub(crate) visibility: VisibilityResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) suggested_house: Option<HouseOption>,
}

pub(crate) fn resolve_report(
    catalog: &SchoolCatalog,
    school_id: &str,
    submission: &Value,
) -> Result<ResolveReport, AppError> {
    let school = catalog
        .get(school_id)
        .ok_or_else(|| AppError::UnknownSchool(school_id.to_string()))?;
    let profile = validate_profile(submission)?;

    let seed = seed_for(&format!("{}:{}", school.id(), profile.child.first_name));
    let suggested_house = seeded_suggestion(school.houses(), &profile, seed).cloned();

    Ok(ResolveReport {
        school: school.id().clone(),
        child_name: profile.child.first_name.clone(),
        entry_point: profile.entry.point.to_string(),
        visibility: school.resolve(&profile),
        suggested_house,
    })
}

pub(crate) fn run_resolve(args: ResolveArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.schools_dir.as_deref())?;
    let raw = fs::read_to_string(&args.profile)?;
    let submission: Value = serde_json::from_str(&raw)?;

    let report = resolve_report(&catalog, &args.school, &submission)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// One line per school describing what was loaded.
pub(crate) fn check_lines(catalog: &SchoolCatalog) -> Vec<String> {
    catalog
        .schools()
        .map(|school| {
            format!(
                "{:<18} {:>2} modules, {:>2} rules, {:>2} tour stops, {} houses",
                school.id().as_str(),
                school.registry().len(),
                school.rules().len(),
                school.registry().canonical_tour().len(),
                school.houses().len()
            )
        })
        .collect()
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.schools_dir.as_deref())?;
    for line in check_lines(&catalog) {
        println!("{line}");
    }
    println!("{} school configuration(s) OK", catalog.len());
    Ok(())
}
