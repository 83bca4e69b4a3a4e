use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Arg, ArgMatches, Command};
use tracing::info;

use crate::services::{
    DirectionsService, FareEstimator, FixedLocationProvider, GeminiClient, GeminiConfig,
    ItineraryGenerator, RouteResolver, RoutingConfig, TravelMode,
};
use crate::storage::{FavoritesStore, FileStore, HistoryStore, KvStore, PlanStore};
use crate::types::{Coordinates, Plan};
use crate::wizard::{format_yen, BootstrapQuery, Stage, Wizard, WizardParams};

const DEFAULT_DATA_DIR: &str = ".trip-planner";

/// CLI entry point for the trip-planner tool
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let matches = Command::new("trip-planner")
        .version("0.1.0")
        .about("AI-assisted travel itinerary planner")
        .arg(
            Arg::new("gemini-key")
                .long("gemini-key")
                .value_name("KEY")
                .help("Gemini API key (or set GEMINI_API_KEY)")
                .global(true),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Generation model to use")
                .global(true),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory for saved plans and history")
                .global(true),
        )
        .arg(
            Arg::new("location")
                .long("location")
                .value_name("LAT,LNG")
                .help("Current position used for transport-cost estimation")
                .global(true),
        )
        .subcommand(
            Command::new("plan")
                .about("Run the four-stage planning wizard")
                .arg(
                    Arg::new("resume")
                        .long("resume")
                        .value_name("ID")
                        .help("Resume a saved plan by id"),
                )
                .arg(
                    Arg::new("shared")
                        .long("shared")
                        .value_name("PAYLOAD")
                        .help("Restore a plan from a shared link payload"),
                ),
        )
        .subcommand(
            Command::new("route")
                .about("Search a route and estimate the fare")
                .arg(Arg::new("origin").required(true).index(1))
                .arg(Arg::new("destination").required(true).index(2))
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_name("MODE")
                        .help("DRIVING, WALKING, BICYCLING or TRANSIT")
                        .default_value("DRIVING"),
                )
                .arg(
                    Arg::new("ors-key")
                        .long("ors-key")
                        .value_name("KEY")
                        .help("openrouteservice API key (or set ORS_API_KEY)"),
                ),
        )
        .subcommand(Command::new("list").about("List saved plans"))
        .subcommand(
            Command::new("show")
                .about("Show a saved plan")
                .arg(Arg::new("id").required(true).index(1)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a saved plan")
                .arg(Arg::new("id").required(true).index(1)),
        )
        .subcommand(
            Command::new("share")
                .about("Print the share payload for a saved plan")
                .arg(Arg::new("id").required(true).index(1)),
        )
        .subcommand(Command::new("favorites").about("List favorite destinations"))
        .subcommand(Command::new("history").about("Show recent activity"))
        .get_matches();

    match matches.subcommand() {
        Some(("plan", sub)) => run_wizard(sub).await,
        Some(("route", sub)) => run_route_search(sub).await,
        Some(("list", sub)) => {
            let (_, plans) = stores(sub);
            let records = plans.list().await;
            if records.is_empty() {
                println!("保存されたプランはありません");
            }
            for record in records {
                println!(
                    "{}  {}  {}",
                    record.id,
                    record.saved_at.format("%Y-%m-%d %H:%M"),
                    record.plan.summary
                );
            }
            Ok(())
        }
        Some(("show", sub)) => {
            let (_, plans) = stores(sub);
            let id = required(sub, "id")?;
            let record = plans
                .get(id)
                .await
                .ok_or_else(|| anyhow!("plan `{id}` not found"))?;
            print_plan(&record.plan, &record.params);
            Ok(())
        }
        Some(("delete", sub)) => {
            let (_, plans) = stores(sub);
            let id = required(sub, "id")?;
            plans.delete(id).await?;
            println!("削除しました: {id}");
            Ok(())
        }
        Some(("share", sub)) => {
            let (_, plans) = stores(sub);
            let id = required(sub, "id")?;
            let record = plans
                .get(id)
                .await
                .ok_or_else(|| anyhow!("plan `{id}` not found"))?;
            println!("{}", crate::storage::encode_for_sharing(&record.plan)?);
            Ok(())
        }
        Some(("favorites", sub)) => {
            let (kv, _) = stores(sub);
            let favorites = FavoritesStore::new(kv);
            for entry in favorites.list().await {
                println!(
                    "{}  {}  (追加: {})",
                    entry.destination.id,
                    entry.destination.name,
                    entry.added_at.format("%Y-%m-%d")
                );
            }
            Ok(())
        }
        Some(("history", sub)) => {
            let (kv, _) = stores(sub);
            let history = HistoryStore::new(kv);
            for entry in history.list().await {
                println!(
                    "{}  [{}]  {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.kind,
                    entry.label
                );
            }
            Ok(())
        }
        _ => Err(anyhow!("no subcommand given; try `trip-planner plan`")),
    }
}

fn stores(matches: &ArgMatches) -> (Arc<dyn KvStore>, PlanStore) {
    let data_dir = matches
        .get_one::<String>("data-dir")
        .map(String::as_str)
        .unwrap_or(DEFAULT_DATA_DIR);
    let kv: Arc<dyn KvStore> = Arc::new(FileStore::new(data_dir));
    let plans = PlanStore::new(Arc::clone(&kv));
    (kv, plans)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing required argument `{name}`"))
}

fn gemini_client(matches: &ArgMatches) -> anyhow::Result<Arc<GeminiClient>> {
    let mut config = match matches.get_one::<String>("gemini-key") {
        Some(key) => GeminiConfig {
            api_key: key.clone(),
            ..GeminiConfig::default()
        },
        None => GeminiConfig::from_env()
            .context("Gemini API key is required: set GEMINI_API_KEY or pass --gemini-key")?,
    };
    if let Some(model) = matches.get_one::<String>("model") {
        config.model = model.clone();
    }
    Ok(Arc::new(GeminiClient::new(config)?))
}

fn location_provider(matches: &ArgMatches) -> anyhow::Result<FixedLocationProvider> {
    match matches.get_one::<String>("location") {
        Some(raw) => {
            let (lat, lng) = raw
                .split_once(',')
                .ok_or_else(|| anyhow!("--location expects LAT,LNG"))?;
            Ok(FixedLocationProvider::new(Coordinates::new(
                lat.trim().parse().context("invalid latitude")?,
                lng.trim().parse().context("invalid longitude")?,
            )))
        }
        None => Ok(FixedLocationProvider::tokyo_station()),
    }
}

async fn run_route_search(matches: &ArgMatches) -> anyhow::Result<()> {
    let origin = required(matches, "origin")?;
    let destination = required(matches, "destination")?;
    let mode: TravelMode = matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("DRIVING")
        .parse()?;

    let routing = match matches.get_one::<String>("ors-key") {
        Some(key) => RoutingConfig {
            api_key: key.clone(),
            ..RoutingConfig::default()
        },
        None => RoutingConfig::from_env()
            .context("openrouteservice key is required: set ORS_API_KEY or pass --ors-key")?,
    };

    let directions = DirectionsService::new(
        RouteResolver::new(routing),
        FareEstimator::new(gemini_client(matches)?),
    );

    let result = directions.search(origin, destination, mode).await?;
    println!("所要時間: {}", result.duration);
    println!("距離: {}", result.distance_text);
    println!("概算運賃: {}", result.fare_text);
    Ok(())
}

async fn run_wizard(matches: &ArgMatches) -> anyhow::Result<()> {
    let client = gemini_client(matches)?;
    let (kv, plans) = stores(matches);
    let favorites = FavoritesStore::new(Arc::clone(&kv));
    let history = HistoryStore::new(kv);

    let mut wizard = Wizard::new(
        ItineraryGenerator::new(Arc::clone(&client)),
        FareEstimator::new(client),
        Arc::new(location_provider(matches)?),
        plans,
    );

    let query = BootstrapQuery {
        plan_id: matches.get_one::<String>("resume").cloned(),
        shared_plan: matches.get_one::<String>("shared").cloned(),
    };
    if wizard.bootstrap(&query).await {
        info!("bootstrapped into the plan stage");
    }

    // Stage 1: activity
    if wizard.stage() == Stage::Activity {
        loop {
            let activity = prompt_line("やりたいことを入力してください (例: スキー): ")?;
            match wizard.submit_activity(&activity) {
                Ok(()) => {
                    history.record("activity", &activity).await?;
                    break;
                }
                Err(err) => println!("{}", err.message),
            }
        }
    }

    // Stage 2: destination
    if wizard.stage() == Stage::Destination {
        println!("おすすめの旅行先を探しています...");
        loop {
            match wizard.load_destinations().await {
                Ok(_) => break,
                Err(err) => {
                    if ask_retry(&err)? {
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }

        loop {
            println!();
            for (i, dest) in wizard.destinations().iter().enumerate() {
                println!(
                    "  [{}] {} — {} (目安: ¥{}, ベストシーズン: {})",
                    i + 1,
                    dest.name,
                    dest.description,
                    format_yen(dest.estimated_cost),
                    dest.best_season
                );
            }
            let answer =
                prompt_line("番号で選択、m でさらに読み込み、f <番号> でお気に入り登録: ")?;

            if answer.eq_ignore_ascii_case("m") {
                println!("さらに読み込んでいます...");
                if let Err(err) = wizard.load_more().await {
                    println!("エラー: {err}");
                }
                continue;
            }
            if let Some(index) = answer.strip_prefix("f ").and_then(|n| n.parse::<usize>().ok()) {
                if let Some(dest) = wizard.destinations().get(index.wrapping_sub(1)).cloned() {
                    let now_favorite = favorites.toggle(&dest).await?;
                    println!(
                        "{}: {}",
                        dest.name,
                        if now_favorite {
                            "お気に入りに追加しました"
                        } else {
                            "お気に入りを解除しました"
                        }
                    );
                }
                continue;
            }
            if let Ok(index) = answer.parse::<usize>() {
                if let Some(dest) = wizard.destinations().get(index.wrapping_sub(1)).cloned() {
                    let request = wizard.choose_destination(dest)?;
                    println!("現在地から交通費を計算中...");
                    let update = wizard.resolve_transport_cost(&request).await;
                    wizard.apply_transport_cost(update);
                    break;
                }
            }
            println!("入力を認識できませんでした");
        }
    }

    // Stage 3: details
    if wizard.stage() == Stage::Details {
        println!(
            "概算交通費: ¥{}（現在地からの片道/人）",
            format_yen(wizard.params().transport_cost)
        );
        loop {
            let start = prompt_date("開始日 (YYYY-MM-DD): ")?;
            let end = prompt_date("終了日 (YYYY-MM-DD): ")?;
            wizard.set_dates(Some(start), Some(end));

            let budget = prompt_line("総予算 (円): ")?;
            wizard.set_budget(budget.replace(',', "").parse().ok());

            let include = prompt_line("交通費を予算に含めますか? [Y/n]: ")?;
            wizard.set_include_transport(!include.eq_ignore_ascii_case("n"));

            let preferences = prompt_line("その他のご要望 (任意): ")?;
            wizard.set_preferences(&preferences);

            match wizard.submit_details() {
                Ok(()) => break,
                Err(errors) => {
                    for error in errors {
                        println!("  {}: {}", error.field, error.message);
                    }
                }
            }
        }
    }

    // Stage 4: plan
    if wizard.generated_plan().is_none() {
        println!("旅行プランを作成中... AIがあなただけの特別プランを考えています");
        loop {
            match wizard.generate().await {
                Ok(_) => break,
                Err(err) => {
                    if ask_retry(&err)? {
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
        let activity = wizard.params().activity.clone();
        history.record("plan", &activity).await?;
    }

    let params = wizard.params().clone();
    if let Some(plan) = wizard.generated_plan() {
        print_plan(plan, &params);
    }

    if prompt_line("プランを保存しますか? [y/N]: ")?.eq_ignore_ascii_case("y") {
        let record = wizard.save().await?;
        println!("保存しました: {}", record.id);
    }
    if prompt_line("共有リンクを発行しますか? [y/N]: ")?.eq_ignore_ascii_case("y") {
        match wizard.share_link() {
            Ok(payload) => println!("共有用ペイロード:\n{payload}"),
            Err(err) => println!("共有リンクの作成に失敗しました: {err}"),
        }
    }

    Ok(())
}

/// Ask whether to retry after a retryable failure.
fn ask_retry(err: &crate::error::PlannerError) -> anyhow::Result<bool> {
    println!("エラー: {err}");
    Ok(err.is_retryable() && prompt_line("再試行しますか? [y/N]: ")?.eq_ignore_ascii_case("y"))
}

fn print_plan(plan: &Plan, params: &WizardParams) {
    println!();
    println!("=== あなたの旅行プラン ===");
    println!("{}", plan.summary);

    for day in &plan.itinerary {
        println!();
        println!("-- {}日目 {} : {}", day.day, day.date, day.title);
        for item in &day.items {
            println!(
                "  {}  {} @ {}  ¥{}",
                item.time,
                item.activity,
                item.location,
                format_yen(item.cost)
            );
            println!("      {}", item.description);
            if let Some(notes) = &item.notes {
                println!("      ※ {notes}");
            }
        }
    }

    if !plan.hotels.is_empty() {
        println!();
        println!("-- 宿泊先");
        for hotel in &plan.hotels {
            println!(
                "  {} ({})  ¥{}/泊 × {}泊",
                hotel.name,
                hotel.kind,
                format_yen(hotel.price_per_night),
                hotel.total_nights
            );
            if let Some(reason) = &hotel.reason {
                println!("      {reason}");
            }
        }
    }

    let breakdown = &plan.budget_breakdown;
    println!();
    println!("-- 概算予算");
    if params.include_transport {
        println!(
            "  交通費 (現在地〜目的地)  ¥{}",
            format_yen(params.transport_cost)
        );
    }
    println!("  現地交通費              ¥{}", format_yen(breakdown.transportation));
    println!("  宿泊費                  ¥{}", format_yen(breakdown.accommodation));
    println!("  アクティビティ          ¥{}", format_yen(breakdown.activities));
    println!("  食事                    ¥{}", format_yen(breakdown.meals));
    println!("  その他                  ¥{}", format_yen(breakdown.other));
    let transport = if params.include_transport {
        params.transport_cost
    } else {
        0
    };
    println!(
        "  合計見積もり            ¥{}",
        format_yen(breakdown.total + transport)
    );

    if !plan.tips.is_empty() {
        println!();
        println!("-- 旅のアドバイス");
        for tip in &plan.tips {
            println!("  ・{tip}");
        }
    }
    if !plan.packing_list.is_empty() {
        println!();
        println!("-- 持ち物リスト");
        for item in &plan.packing_list {
            println!("  ・{item}");
        }
    }
}

fn prompt_line(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_date(label: &str) -> anyhow::Result<NaiveDate> {
    loop {
        let raw = prompt_line(label)?;
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => return Ok(date),
            Err(_) => println!("YYYY-MM-DD 形式で入力してください"),
        }
    }
}
