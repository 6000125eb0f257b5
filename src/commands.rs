//! CLI commands and their output.

use clap::{Args, Subcommand};
use color_eyre::Result;
use serde::Serialize;
use std::time::Duration;

use halakat::api::types::{Enrollment, Halaka, Invitation, PaymentSession, StudentProfile, TeacherProfile};
use halakat::api::PaginationState;
use halakat::session::Session;
use halakat::store::{
  HalakaStats, InvitationStats, RefreshEvent, Refresher, Resource, ResourceStore, TeacherStats,
};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List halakat
  List(HalakatListArgs),
  /// Show one halaka
  Show { id: String },
  /// Enroll in a halaka
  Enroll {
    id: String,
    /// Start checkout right after enrolling
    #[arg(long)]
    pay: bool,
  },
  /// Summary of the current halakat page
  Stats,
  /// Browse teachers
  Teachers {
    #[command(subcommand)]
    action: TeachersCommand,
  },
  /// Show the signed-in student's profile
  Profile,
  /// Manage invitations
  Invitations {
    #[command(subcommand)]
    action: InvitationsCommand,
  },
  /// Halakat, teachers and invitations at a glance
  Dashboard,
}

#[derive(Args, Debug, Default)]
pub struct HalakatListArgs {
  /// active, upcoming, completed, cancelled or all
  #[arg(long)]
  pub status: Option<String>,
  #[arg(long)]
  pub search: Option<String>,
  #[arg(long)]
  pub page: Option<u32>,
  /// Items per page (default: page_size from config)
  #[arg(long)]
  pub limit: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum TeachersCommand {
  List {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
  },
  Show {
    id: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum InvitationsCommand {
  List,
  Accept { id: String },
  Reject { id: String },
  /// Poll for new invitations until interrupted
  Watch {
    /// Seconds between polls
    #[arg(long, default_value_t = 30)]
    interval: u64,
  },
}

/// Output mode for every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
  Text,
  Json,
}

impl Output {
  fn emit<T: Serialize>(self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    match self {
      Output::Json => println!("{}", serde_json::to_string_pretty(value)?),
      Output::Text => println!("{}", text(value)),
    }
    Ok(())
  }
}

#[derive(Serialize)]
struct Page<'a, T> {
  items: &'a [T],
  pagination: PaginationState,
}

#[derive(Serialize)]
struct Enrolled {
  enrollment: Enrollment,
  payment: Option<PaymentSession>,
}

#[derive(Serialize)]
struct Dashboard {
  halakat: HalakaStats,
  teachers: TeacherStats,
  invitations: InvitationStats,
}

pub async fn run(session: &Session, command: Command, output: Output) -> Result<()> {
  let page_size = session.page_size();

  match command {
    Command::List(args) => {
      let store = &session.halakat;
      apply_filters(
        store,
        [("status", args.status), ("search", args.search)],
        args.page,
      );
      store.fetch_current(args.limit.unwrap_or(page_size)).await?;
      print_page(store, output, format_halaka)
    }
    Command::Show { id } => {
      session.halakat.fetch_one(&id).await?;
      print_current(&session.halakat, output, format_halaka_detail)
    }
    Command::Enroll { id, pay } => {
      let enrollment = session.halakat.enroll(&id).await?;
      let payment = if pay {
        Some(session.halakat.initiate_payment(&enrollment).await?)
      } else {
        None
      };
      output.emit(&Enrolled { enrollment, payment }, format_enrolled)
    }
    Command::Stats => {
      session.halakat.fetch_current(page_size).await?;
      output.emit(&session.halakat.get_stats(), format_halaka_stats)
    }
    Command::Teachers { action } => match action {
      TeachersCommand::List {
        search,
        page,
        limit,
      } => {
        let store = &session.teachers;
        apply_filters(store, [("search", search)], page);
        store.fetch_current(limit.unwrap_or(page_size)).await?;
        print_page(store, output, format_teacher)
      }
      TeachersCommand::Show { id } => {
        session.teachers.fetch_one(&id).await?;
        print_current(&session.teachers, output, format_teacher_detail)
      }
    },
    Command::Profile => {
      session.students.fetch_me().await?;
      print_current(&session.students, output, format_student)
    }
    Command::Invitations { action } => run_invitations(session, action, output).await,
    Command::Dashboard => {
      futures::try_join!(
        session.halakat.fetch_current(page_size),
        session.teachers.fetch_current(page_size),
        session.invitations.fetch_current(page_size),
      )?;
      let dashboard = Dashboard {
        halakat: session.halakat.get_stats(),
        teachers: session.teachers.get_stats(),
        invitations: session.invitations.get_stats(),
      };
      output.emit(&dashboard, format_dashboard)
    }
  }
}

async fn run_invitations(session: &Session, action: InvitationsCommand, output: Output) -> Result<()> {
  let store = &session.invitations;
  match action {
    InvitationsCommand::List => {
      store.fetch_current(session.page_size()).await?;
      print_page(store, output, format_invitation)
    }
    InvitationsCommand::Accept { id } => respond(store, &id, true, output).await,
    InvitationsCommand::Reject { id } => respond(store, &id, false, output).await,
    InvitationsCommand::Watch { interval } => {
      let mut refresher = Refresher::spawn(
        store.clone(),
        Duration::from_secs(interval.max(1)),
        session.page_size(),
      );
      loop {
        tokio::select! {
          _ = tokio::signal::ctrl_c() => break,
          event = refresher.next() => match event {
            Some(RefreshEvent::Updated(_)) => {
              output.emit(&store.get_stats(), format_invitation_stats)?;
            }
            Some(RefreshEvent::Failed(err)) => eprintln!("{}", err),
            None => break,
          },
        }
      }
      refresher.stop();
      Ok(())
    }
  }
}

async fn respond(store: &ResourceStore<Invitation>, id: &str, accept: bool, output: Output) -> Result<()> {
  store.respond(id, accept).await?;
  match store.items().into_iter().find(|i| i.id == id) {
    Some(invitation) => output.emit(&invitation, format_invitation),
    None => {
      let verb = if accept { "accepted" } else { "rejected" };
      output.emit(&id, |id| format!("{} {}", id, verb))
    }
  }
}

fn apply_filters<R: Resource, const N: usize>(
  store: &ResourceStore<R>,
  filters: [(&str, Option<String>); N],
  page: Option<u32>,
) {
  for (key, value) in filters {
    if let Some(value) = value {
      store.set_filter(key, value);
    }
  }
  // Page last: any other filter resets it
  if let Some(page) = page {
    store.set_filter("page", page);
  }
}

fn print_page<R: Resource>(
  store: &ResourceStore<R>,
  output: Output,
  row: fn(&R) -> String,
) -> Result<()> {
  let items = store.get_filtered_list();
  let page = Page {
    items: &items,
    pagination: store.pagination(),
  };
  output.emit(&page, |page| {
    let mut lines: Vec<String> = page.items.iter().map(row).collect();
    if lines.is_empty() {
      lines.push("(none)".to_string());
    }
    lines.push(format_pagination(&page.pagination));
    lines.join("\n")
  })
}

fn print_current<R: Resource>(
  store: &ResourceStore<R>,
  output: Output,
  detail: fn(&R) -> String,
) -> Result<()> {
  match store.current() {
    Some(item) => output.emit(&item, detail),
    None => output.emit(&serde_json::Value::Null, |_| "(none)".to_string()),
  }
}

// ============================================================================
// Text rendering
// ============================================================================

fn format_pagination(p: &PaginationState) -> String {
  let mut line = format!("page {}/{} ({} total)", p.current_page, p.total_pages, p.total_items);
  if p.has_next {
    line.push_str(", more available");
  }
  line
}

fn format_halaka(h: &Halaka) -> String {
  format!(
    "{:<10} {:<10} {:<30} {:>3}/{:<3} {}",
    h.id,
    h.status.as_str(),
    h.title,
    h.current_students,
    h.max_students,
    h.teacher_name
  )
}

fn format_halaka_detail(h: &Halaka) -> String {
  let mut lines = vec![
    format!("{} ({})", h.title, h.id),
    format!("status:   {}", h.status.as_str()),
    format!("type:     {}", h.halaka_type),
    format!("teacher:  {}", h.teacher_name),
    format!(
      "seats:    {}/{} ({} available)",
      h.current_students,
      h.max_students,
      h.available_seats()
    ),
    format!("price:    {} {}", h.price, h.currency),
  ];
  if let Some(schedule) = &h.schedule {
    lines.push(format!("schedule: {}", schedule));
  }
  if let (Some(start), end) = (&h.start_date, &h.end_date) {
    lines.push(format!("dates:    {} - {}", start, end.as_deref().unwrap_or("?")));
  }
  lines.push(String::new());
  lines.push(h.description.clone());
  lines.join("\n")
}

fn format_enrolled(e: &Enrolled) -> String {
  let mut line = format!(
    "enrolled in {} ({}): {} {} {}",
    e.enrollment.halaka_id, e.enrollment.id, e.enrollment.status, e.enrollment.amount, e.enrollment.currency
  );
  if let Some(payment) = &e.payment {
    line.push_str(&format!(
      "\npayment {} {}: {}",
      payment.reference,
      payment.status,
      payment.payment_url.as_deref().unwrap_or("-")
    ));
  }
  line
}

fn format_halaka_stats(s: &HalakaStats) -> String {
  format!(
    "halakat: {} (active {}, upcoming {}, completed {})\nstudents: {} enrolled, {} open seats",
    s.total, s.active, s.upcoming, s.completed, s.enrolled_students, s.open_seats
  )
}

fn format_teacher(t: &TeacherProfile) -> String {
  format!(
    "{:<10} {:<25} {:.1}★ ({}) {}",
    t.id,
    t.name,
    t.rating,
    t.reviews_count,
    if t.verified { "verified" } else { "" }
  )
}

fn format_teacher_detail(t: &TeacherProfile) -> String {
  let mut lines = vec![
    format!("{} ({})", t.name, t.id),
    format!("specialization: {}", t.specialization),
    format!("rating:         {:.1} from {} reviews", t.rating, t.reviews_count),
    format!("experience:     {} years", t.experience_years),
    format!("hourly rate:    {}", t.hourly_rate),
  ];
  if !t.languages.is_empty() {
    lines.push(format!("languages:      {}", t.languages.join(", ")));
  }
  lines.push(String::new());
  lines.push(t.bio.clone());
  lines.join("\n")
}

fn format_student(s: &StudentProfile) -> String {
  format!(
    "{} ({})\nlevel: {}\nenrolled: {}, completed sessions: {}\nprogress: {}%",
    s.name, s.id, s.level, s.enrolled_count, s.completed_sessions, s.progress
  )
}

fn format_invitation(i: &Invitation) -> String {
  format!(
    "{:<10} {:<9} {} from {}",
    i.id,
    i.status.as_str(),
    i.halaka_title,
    i.sender_name
  )
}

fn format_invitation_stats(s: &InvitationStats) -> String {
  format!(
    "invitations: {} pending, {} accepted, {} rejected",
    s.pending, s.accepted, s.rejected
  )
}

fn format_dashboard(d: &Dashboard) -> String {
  format!(
    "{}\nteachers: {} ({} verified, average rating {:.1})\n{}",
    format_halaka_stats(&d.halakat),
    d.teachers.total,
    d.teachers.verified,
    d.teachers.average_rating,
    format_invitation_stats(&d.invitations)
  )
}
