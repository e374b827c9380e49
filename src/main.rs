use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use f1_stats::config::{DashboardConfig, DEFAULT_CONFIG_FILE};
use f1_stats::dataset::{Dataset, Warnings};
use f1_stats::providers::{
    http_client, CachedGeometry, CachedPhotos, GeometryProvider, HttpGeometryProvider, Memoized,
    PhotoLookupProvider, WikipediaPhotoLookup,
};
use f1_stats::query::geography::{country_totals, CareerMetric};
use f1_stats::query::grand_prix::{nationality_metric, overview, NationalityMetric};
use f1_stats::query::profile::{
    driver_profile, reliability, season_series, team_profile, wins_by_country, SeasonMetric,
};
use f1_stats::query::results::{
    available_sessions, pit_stop_summary, race_id, session_classification,
};
use f1_stats::query::season::{grid_vs_finish, points_by_season, wins_in_range, year_bounds};
use f1_stats::query::summary::summary;
use f1_stats::query::{CountryValue, Scope};
use f1_stats::schema::Session;

#[derive(Parser)]
#[command(author, version, about = "Statistics over the F1 historical dataset")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Dataset directory, overriding the configuration.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Number of drivers, races and constructors.
    Summary,
    /// Compare drivers over a range of seasons.
    Season {
        #[arg(long)]
        from: Option<i64>,
        #[arg(long)]
        to: Option<i64>,
        /// Driver names, repeatable.
        #[arg(short, long = "driver", required = true)]
        drivers: Vec<String>,
        /// Season for the grid vs finish table of the first driver.
        #[arg(long)]
        grid_year: Option<i64>,
    },
    /// Classification of one session of a race.
    Results {
        year: i64,
        grand_prix: String,
        #[arg(long, value_enum, default_value_t = SessionArg::Race)]
        session: SessionArg,
    },
    /// Mean pit stop duration per driver in a race.
    PitStops { year: i64, grand_prix: String },
    /// History of a grand prix and driver nationalities there.
    GrandPrix {
        name: String,
        #[arg(long, value_enum, default_value_t = NationalityArg::Victories)]
        metric: NationalityArg,
        /// Download the regional boundary archive for the host country.
        #[arg(long)]
        regions: bool,
    },
    /// Career totals per country.
    Geo {
        #[arg(long, value_enum, default_value_t = ScopeArg::Drivers)]
        scope: ScopeArg,
        #[arg(long, value_enum, default_value_t = CareerArg::Championships)]
        metric: CareerArg,
    },
    /// Driver profile.
    Driver {
        name: String,
        #[arg(long, value_enum, default_value_t = SeasonArg::Points)]
        series: SeasonArg,
        /// Look up a portrait.
        #[arg(long)]
        photo: bool,
    },
    /// Team profile.
    Team {
        name: String,
        #[arg(long, value_enum, default_value_t = SeasonArg::Points)]
        series: SeasonArg,
        #[arg(long)]
        photo: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SessionArg {
    Race,
    Qualifying,
    SprintRace,
    SprintQualifying,
    Fp1,
    Fp2,
    Fp3,
}

impl From<SessionArg> for Session {
    fn from(arg: SessionArg) -> Self {
        match arg {
            SessionArg::Race => Session::Race,
            SessionArg::Qualifying => Session::Qualifying,
            SessionArg::SprintRace => Session::SprintRace,
            SessionArg::SprintQualifying => Session::SprintQualifying,
            SessionArg::Fp1 => Session::FreePractice1,
            SessionArg::Fp2 => Session::FreePractice2,
            SessionArg::Fp3 => Session::FreePractice3,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum NationalityArg {
    Victories,
    Podiums,
    Poles,
    Points,
}

impl From<NationalityArg> for NationalityMetric {
    fn from(arg: NationalityArg) -> Self {
        match arg {
            NationalityArg::Victories => NationalityMetric::Victories,
            NationalityArg::Podiums => NationalityMetric::Podiums,
            NationalityArg::Poles => NationalityMetric::Poles,
            NationalityArg::Points => NationalityMetric::Points,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Drivers,
    Constructors,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Drivers => Scope::Drivers,
            ScopeArg::Constructors => Scope::Constructors,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CareerArg {
    Championships,
    Wins,
    Poles,
    Podiums,
    Count,
}

impl From<CareerArg> for CareerMetric {
    fn from(arg: CareerArg) -> Self {
        match arg {
            CareerArg::Championships => CareerMetric::Championships,
            CareerArg::Wins => CareerMetric::Wins,
            CareerArg::Poles => CareerMetric::Poles,
            CareerArg::Podiums => CareerMetric::Podiums,
            CareerArg::Count => CareerMetric::Entities,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SeasonArg {
    Points,
    Wins,
    Podiums,
    Poles,
}

impl From<SeasonArg> for SeasonMetric {
    fn from(arg: SeasonArg) -> Self {
        match arg {
            SeasonArg::Points => SeasonMetric::Points,
            SeasonArg::Wins => SeasonMetric::Wins,
            SeasonArg::Podiums => SeasonMetric::Podiums,
            SeasonArg::Poles => SeasonMetric::Poles,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = DashboardConfig::load(&cli.config)
        .with_context(|| format!("failed to read configuration from {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }
    info!(data_dir = %cfg.data_dir.display(), "opening dataset");

    let ds = Dataset::open(&cfg.data_dir);
    let mut warnings = Warnings::new();
    let start = Instant::now();
    run(cli.command, &ds, &cfg, &mut warnings)?;
    info!(elapsed_ms = start.elapsed().as_secs_f64() * 1000.0, "done");

    for warning in &warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn run(
    command: Command,
    ds: &Dataset,
    cfg: &DashboardConfig,
    warnings: &mut Warnings,
) -> anyhow::Result<()> {
    match command {
        Command::Summary => {
            let counts = summary(ds, warnings);
            println!("{:<20} {:>8}", "Drivers", counts.drivers);
            println!("{:<20} {:>8}", "Races", counts.races);
            println!("{:<20} {:>8}", "Constructors", counts.constructors);
        }
        Command::Season {
            from,
            to,
            drivers,
            grid_year,
        } => {
            let Some((first, last)) = year_bounds(ds, warnings)? else {
                println!("No standings available.");
                return Ok(());
            };
            let from = from.unwrap_or(cfg.default_year_from).max(first);
            let to = to.unwrap_or(last).min(last);
            let names: Vec<&str> = drivers.iter().map(String::as_str).collect();

            println!("Championship points {from}-{to}");
            println!("{:-<60}", "");
            for p in points_by_season(ds, &names, from, to, warnings)? {
                let points = p.points.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
                println!("{:<8} {:<30} {:>10}", p.year, p.driver, points);
            }
            println!();

            println!("Wins {from}-{to}");
            println!("{:-<60}", "");
            let wins = wins_in_range(ds, &names, from, to, warnings)?;
            if wins.is_empty() {
                println!("No wins for the selected drivers in this period.");
            }
            for g in wins {
                println!("{:<40} {:>8}", g.key, g.value);
            }

            if let (Some(year), Some(driver)) = (grid_year, names.first()) {
                println!();
                println!("Grid vs finish: {driver} in {year}");
                println!("{:-<60}", "");
                for r in grid_vs_finish(ds, driver, year, warnings)? {
                    let gp = r.grand_prix.as_deref().unwrap_or("-");
                    println!("{:<40} {:>6} {:>6}", gp, r.grid, r.finish);
                }
            }
        }
        Command::Results {
            year,
            grand_prix,
            session,
        } => {
            let race = race_id(ds, year, &grand_prix, warnings)?;
            let offered = available_sessions(ds, race)?;
            let session = Session::from(session);
            if !offered.contains(&session) {
                let labels: Vec<&str> = offered.iter().map(|s| s.label()).collect();
                println!(
                    "No {session} results for {grand_prix} {year}. Available: {}",
                    labels.join(", ")
                );
                return Ok(());
            }

            println!("{session} - {grand_prix} {year}");
            println!("{:-<100}", "");
            println!(
                "{:<6} {:>4} {:<26} {:<26} {:>14} {:>6} {:>7}",
                "Pos", "No", "Driver", "Team", "Time/Gap", "Laps", "Points"
            );
            println!("{:-<100}", "");
            for r in session_classification(ds, session, race, warnings)? {
                println!(
                    "{:<6} {:>4} {:<26} {:<26} {:>14} {:>6} {:>7}",
                    r.position_text.as_deref().unwrap_or("-"),
                    r.driver_number.map_or_else(String::new, |n| n.to_string()),
                    r.driver,
                    r.team,
                    r.time_or_gap.as_deref().unwrap_or(""),
                    r.laps.map_or_else(String::new, |n| n.to_string()),
                    r.points.map_or_else(String::new, |p| format!("{p}")),
                );
            }
        }
        Command::PitStops { year, grand_prix } => {
            let race = race_id(ds, year, &grand_prix, warnings)?;
            let stops = pit_stop_summary(ds, race, warnings)?;
            if stops.is_empty() {
                println!("No pit stop data for {grand_prix} {year}.");
                return Ok(());
            }
            println!("{:<30} {:>12} {:>6}", "Driver", "Mean (s)", "Stops");
            println!("{:-<50}", "");
            for s in stops {
                let count = s.stops.map_or_else(String::new, |n| n.to_string());
                println!("{:<30} {:>12.2} {:>6}", s.driver, s.mean_seconds, count);
            }
        }
        Command::GrandPrix {
            name,
            metric,
            regions,
        } => {
            let gp = overview(ds, &name, warnings)?;
            println!("{}", gp.name);
            println!("{:-<60}", "");
            println!("{:<24} {}", "Times held", gp.times_held);
            match &gp.top_driver {
                Some((driver, wins)) => {
                    println!("{:<24} {driver} ({wins} wins)", "Most wins (driver)")
                }
                None => println!("{:<24} N/A", "Most wins (driver)"),
            }
            match &gp.top_team {
                Some((team, wins)) => println!("{:<24} {team} ({wins} wins)", "Most wins (team)"),
                None => println!("{:<24} N/A", "Most wins (team)"),
            }
            println!();
            println!("Circuits");
            for c in &gp.circuits {
                println!(
                    "  {:<36} {:<20} {:>9.4} {:>9.4}",
                    c.full_name.as_deref().unwrap_or(&c.id),
                    c.place_name.as_deref().unwrap_or(""),
                    c.latitude.unwrap_or(f64::NAN),
                    c.longitude.unwrap_or(f64::NAN),
                );
            }

            if regions {
                match &gp.alpha3 {
                    Some(code) => {
                        let client = http_client(cfg.http_timeout())?;
                        let geometry: CachedGeometry<_> =
                            Memoized::new(HttpGeometryProvider::new(client));
                        match geometry.boundary_archive(code) {
                            Ok(Some(archive)) => {
                                println!("Regional boundaries for {code}: {} bytes", archive.len())
                            }
                            Ok(None) => println!("No regional boundaries published for {code}."),
                            Err(e) => warn!(error = %e, "regional map omitted"),
                        }
                    }
                    None => println!("Circuits span several countries; no regional map."),
                }
            }

            println!();
            let nationalities = nationality_metric(ds, &name, metric.into(), warnings)?;
            print_countries("Driver nationalities", &nationalities);
        }
        Command::Geo { scope, metric } => {
            let totals = country_totals(ds, scope.into(), metric.into(), warnings)?;
            print_countries("By country", &totals);
        }
        Command::Driver {
            name,
            series,
            photo,
        } => {
            let p = driver_profile(ds, &name, warnings)?;
            println!("{}", p.name);
            println!("{:-<60}", "");
            print_field("Full name", p.full_name.as_deref());
            print_field("Born", p.date_of_birth.as_deref());
            let birthplace = match (&p.place_of_birth, &p.country_of_birth) {
                (Some(place), Some(country)) => Some(format!("{place} ({country})")),
                (place, country) => place.clone().or_else(|| country.clone()),
            };
            print_field("Place of birth", birthplace.as_deref());
            if p.date_of_death.is_some() {
                print_field("Died", p.date_of_death.as_deref());
            }
            print_field("Nationality", p.nationality.as_deref());
            print_field("Number", p.permanent_number.map(|n| n.to_string()).as_deref());
            if p.championships > 0 {
                println!("{:<20} {}", "Championships", p.championships);
            }
            println!("{:<20} {}", "Wins", p.wins);
            println!("{:<20} {}", "Podiums", p.podiums);
            println!("{:<20} {}", "Pole positions", p.poles);
            println!("{:<20} {}", "Races", p.starts);

            let r = reliability(ds, Scope::Drivers, &p.id, warnings)?;
            println!(
                "{:<20} {} finished, {} not finished",
                "Reliability", r.finished, r.not_finished
            );

            if photo {
                print_photo(cfg, &p.name)?;
            }
            print_profile_tail(ds, Scope::Drivers, &p.id, series.into(), warnings)?;
        }
        Command::Team {
            name,
            series,
            photo,
        } => {
            let t = team_profile(ds, &name, warnings)?;
            println!("{}", t.name);
            println!("{:-<60}", "");
            print_field("Full name", t.full_name.as_deref());
            print_field("Country", t.country.as_deref());
            if t.championships > 0 {
                println!("{:<20} {}", "Championships", t.championships);
            }
            let count = |v: Option<i64>| v.map(|n| n.to_string());
            print_field("Wins", count(t.wins).as_deref());
            print_field("Podiums", count(t.podiums).as_deref());
            print_field("Pole positions", count(t.poles).as_deref());
            print_field("1-2 finishes", count(t.one_two_finishes).as_deref());
            print_field("Races", count(t.starts).as_deref());

            if photo {
                print_photo(cfg, &t.name)?;
            }
            print_profile_tail(ds, Scope::Constructors, &t.id, series.into(), warnings)?;
        }
    }
    Ok(())
}

fn print_field(label: &str, value: Option<&str>) {
    println!("{:<20} {}", label, value.unwrap_or("-"));
}

fn print_countries(title: &str, values: &[CountryValue]) {
    println!("{title}");
    println!("{:-<60}", "");
    if values.is_empty() {
        println!("No data.");
    }
    for v in values {
        println!("{:<36} {:<5} {:>12}", v.country, v.alpha3.as_deref().unwrap_or(""), v.value);
    }
}

fn print_photo(cfg: &DashboardConfig, name: &str) -> anyhow::Result<()> {
    let client = http_client(cfg.http_timeout())?;
    let photos: CachedPhotos<_> = Memoized::new(WikipediaPhotoLookup::new(client));
    match photos.photo_url(name) {
        Ok(Some(url)) => print_field("Photo", Some(&url)),
        Ok(None) => print_field("Photo", None),
        Err(e) => warn!(error = %e, "photo omitted"),
    }
    Ok(())
}

fn print_profile_tail(
    ds: &Dataset,
    scope: Scope,
    id: &str,
    series: SeasonMetric,
    warnings: &mut Warnings,
) -> anyhow::Result<()> {
    println!();
    println!("By season ({})", series.column());
    println!("{:-<60}", "");
    for g in season_series(ds, scope, id, series, warnings)? {
        println!("{:<8} {:>10}", g.key, g.value);
    }

    let wins = wins_by_country(ds, scope, id, warnings)?;
    if !wins.countries.is_empty() {
        println!();
        print_countries("Wins by country", &wins.countries);
    }
    if !wins.unmapped_grands_prix.is_empty() {
        warn!(
            grands_prix = ?wins.unmapped_grands_prix,
            "wins at grands prix without a mapped country"
        );
    }
    Ok(())
}
