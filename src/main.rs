mod models;
mod mortgage;
mod planner;
mod projection;
mod storage;

use crate::models::{
    Aggregates, Category, SAVINGS_RATE_TARGET, parse_amount, parse_optional_amount, parse_years,
};
use crate::mortgage::MortgageParams;
use crate::planner::Planner;
use crate::projection::{InvestmentParams, yearly_balances};
use crate::storage::Storage;
use anyhow::{Context, Result};
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{error, info};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, BarChart, Block, Borders, Cell, Chart, Dataset, Paragraph, Row, Table, Wrap,
};
use std::fs::File;
use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    init_logging()?;
    let mut app = App::new()?;
    let res = run(&mut app);
    if let Err(err) = res {
        error!("application error: {err:?}");
        eprintln!("Application error: {err:?}");
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to a file next to the saved data so they never draw over the UI.
fn init_logging() -> Result<()> {
    let path = storage::data_dir()?.join("wealthflow.log");
    let file = File::create(&path).with_context(|| format!("creating {:?}", path))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    stdout
        .execute(EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    disable_raw_mode()?;
    terminal
        .backend_mut()
        .execute(LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;

    result
}

struct App {
    planner: Planner,
    category: Category,
    selected: usize,
    form: Option<Form>,
    last_message: String,
    last_save: Option<Instant>,
}

impl App {
    fn new() -> Result<Self> {
        let storage = Storage::new()?;
        info!("using ledger at {}", storage.path().display());
        let planner = Planner::open(storage);
        Ok(Self {
            planner,
            category: Category::Debts,
            selected: 0,
            form: None,
            last_message: "Loaded data".to_string(),
            last_save: None,
        })
    }

    fn selected_id(&self) -> Option<String> {
        self.planner
            .ledger()
            .items(self.category)
            .get(self.selected)
            .map(|item| item.id.clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.planner.ledger().items(self.category).len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn mark_saved(&mut self, message: impl Into<String>) {
        self.last_save = Some(Instant::now());
        self.last_message = message.into();
    }

    fn submit(&mut self, form: &Form) {
        match &form.kind {
            FormKind::Income => {
                self.planner.set_income(parse_amount(form.value(0)));
                self.mark_saved("Income updated");
            }
            FormKind::Item { category, id } => {
                self.planner
                    .rename_item(*category, id, form.value(0).trim().to_string());
                self.planner
                    .set_item_amount(*category, id, parse_amount(form.value(1)));
                self.mark_saved(format!("{category} item saved"));
            }
            FormKind::Investment => {
                self.planner.set_investment_params(InvestmentParams {
                    initial_principal: parse_amount(form.value(0)),
                    monthly_contribution: parse_amount(form.value(1)),
                    annual_rate_percent: parse_amount(form.value(2)),
                    years: parse_years(form.value(3)),
                });
                self.last_message = "Projection updated".into();
            }
            FormKind::Mortgage => {
                let params = form.mortgage_params(self.planner.mortgage_params());
                self.planner.set_mortgage_params(params);
                self.last_message = "Mortgage updated".into();
            }
        }
    }
}

enum FormKind {
    Income,
    Item { category: Category, id: String },
    Investment,
    Mortgage,
}

#[derive(Clone)]
struct Field {
    label: &'static str,
    value: String,
}

impl Field {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

struct Form {
    title: String,
    kind: FormKind,
    fields: Vec<Field>,
    index: usize,
}

impl Form {
    fn income(current: f64) -> Self {
        Self {
            title: "Monthly net income".into(),
            kind: FormKind::Income,
            fields: vec![Field::new("Income", format_input(current))],
            index: 0,
        }
    }

    fn item(category: Category, id: String, name: &str, amount: f64) -> Self {
        Self {
            title: format!("Edit {category} item"),
            kind: FormKind::Item { category, id },
            fields: vec![
                Field::new("Label (e.g., Rent)", name),
                Field::new("Amount", format_input(amount)),
            ],
            index: 0,
        }
    }

    fn investment(params: &InvestmentParams) -> Self {
        Self {
            title: "Investment projection".into(),
            kind: FormKind::Investment,
            fields: vec![
                Field::new("Initial investment", format_input(params.initial_principal)),
                Field::new("Monthly contribution", format_input(params.monthly_contribution)),
                Field::new("Annual return (%)", format_input(params.annual_rate_percent)),
                Field::new("Years", params.years.to_string()),
            ],
            index: 0,
        }
    }

    fn mortgage(params: &MortgageParams) -> Self {
        Self {
            title: "Mortgage".into(),
            kind: FormKind::Mortgage,
            fields: vec![
                Field::new("Home price", format_input(params.home_price)),
                Field::new("Down payment", format_input(params.down_payment)),
                Field::new("Interest rate (%)", format_input(params.annual_rate_percent)),
                Field::new("Term (years)", params.years.to_string()),
                Field::new(
                    "Custom payment (blank = formula)",
                    params
                        .active_custom_payment()
                        .map(format_input)
                        .unwrap_or_default(),
                ),
            ],
            index: 0,
        }
    }

    /// A blank custom payment turns the override off but keeps the stored amount for `c`.
    fn mortgage_params(&self, previous: &MortgageParams) -> MortgageParams {
        let entered = parse_optional_amount(self.value(4));
        MortgageParams {
            home_price: parse_amount(self.value(0)),
            down_payment: parse_amount(self.value(1)),
            annual_rate_percent: parse_amount(self.value(2)),
            years: parse_years(self.value(3)),
            custom_payment: entered.or(previous.custom_payment),
            use_custom_payment: entered.is_some(),
        }
    }

    fn value(&self, idx: usize) -> &str {
        self.fields.get(idx).map(|f| f.value.as_str()).unwrap_or("")
    }

    fn current_mut(&mut self) -> &mut Field {
        &mut self.fields[self.index]
    }

    fn next(&mut self) {
        if self.index + 1 < self.fields.len() {
            self.index += 1;
        }
    }

    fn prev(&mut self) {
        if self.index > 0 {
            self.index -= 1;
        }
    }

    fn push_char(&mut self, c: char) {
        self.current_mut().value.push(c);
    }

    fn backspace(&mut self) {
        self.current_mut().value.pop();
    }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;
        if event::poll(Duration::from_millis(200))?
            && let Event::Key(key) = event::read()?
            && handle_key(app, key)
        {
            return Ok(());
        }
    }
}

/// Returns true when the app should exit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if let Some(mut form) = app.form.take() {
        match key.code {
            KeyCode::Esc => app.last_message = format!("Cancelled {}", form.title.to_lowercase()),
            KeyCode::Enter if form.index + 1 >= form.fields.len() => app.submit(&form),
            KeyCode::Enter | KeyCode::Tab | KeyCode::Down => {
                form.next();
                app.form = Some(form);
            }
            KeyCode::BackTab | KeyCode::Up => {
                form.prev();
                app.form = Some(form);
            }
            KeyCode::Backspace => {
                form.backspace();
                app.form = Some(form);
            }
            KeyCode::Char(c) => {
                form.push_char(c);
                app.form = Some(form);
            }
            _ => app.form = Some(form),
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Tab | KeyCode::Char('l') => {
            app.category = app.category.next();
            app.selected = 0;
        }
        KeyCode::BackTab | KeyCode::Char('h') => {
            app.category = app.category.prev();
            app.selected = 0;
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.selected += 1;
            app.clamp_selection();
        }
        KeyCode::Up | KeyCode::Char('k') => app.selected = app.selected.saturating_sub(1),
        KeyCode::Char('a') => {
            let id = app.planner.add_line_item(app.category);
            app.selected = app.planner.ledger().items(app.category).len() - 1;
            app.form = Some(Form::item(app.category, id, "", 0.0));
            app.mark_saved(format!("Added {} item", app.category));
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(item) = app
                .planner
                .ledger()
                .items(app.category)
                .get(app.selected)
            {
                app.form = Some(Form::item(
                    app.category,
                    item.id.clone(),
                    &item.name,
                    item.amount,
                ));
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = app.selected_id() {
                app.planner.delete_line_item(app.category, &id);
                app.clamp_selection();
                app.mark_saved("Item removed");
            }
        }
        KeyCode::Char('i') => app.form = Some(Form::income(app.planner.ledger().income)),
        KeyCode::Char('p') => app.form = Some(Form::investment(app.planner.investment_params())),
        KeyCode::Char('m') => app.form = Some(Form::mortgage(app.planner.mortgage_params())),
        KeyCode::Char('c') => {
            let mut params = *app.planner.mortgage_params();
            if params.custom_payment.is_some() {
                params.use_custom_payment = !params.use_custom_payment;
                app.planner.set_mortgage_params(params);
                app.last_message = if params.use_custom_payment {
                    "Custom payment on".into()
                } else {
                    "Custom payment off".into()
                };
            } else {
                app.last_message = "Set a custom payment with m first".into();
            }
        }
        KeyCode::Char('r') => {
            app.planner.reload();
            app.clamp_selection();
            app.last_message = "Reloaded data".into();
        }
        _ => {}
    }

    false
}

fn draw(f: &mut ratatui::Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(12),
            Constraint::Length(8),
        ])
        .split(f.size());

    render_header(f, layout[0], app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ]
            .as_ref(),
        )
        .split(layout[1]);

    let aggregates = app.planner.aggregates();
    render_ledger(f, columns[0], app, &aggregates);
    render_summary(f, columns[1], &aggregates);

    let calculators = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(columns[2]);
    render_projection(f, calculators[0], app);
    render_mortgage(f, calculators[1], app);

    render_footer(f, layout[2], app);
}

fn render_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "WealthFlow",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  | monthly net income "),
        Span::styled(
            format_currency(app.planner.ledger().income),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  | data "),
        Span::styled(
            app.planner.storage().path().to_string_lossy().into_owned(),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .wrap(Wrap { trim: true });
    f.render_widget(header, area);
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Debts => Color::Red,
        Category::Expenses => Color::Yellow,
        Category::Savings => Color::Blue,
        Category::Investments => Color::Green,
    }
}

fn render_ledger(f: &mut ratatui::Frame, area: Rect, app: &App, aggregates: &Aggregates) {
    let ledger = app.planner.ledger();
    let mut rows: Vec<Row> = Vec::new();

    for category in Category::ALL {
        let active = category == app.category;
        let mut heading = Style::default()
            .fg(category_color(category))
            .add_modifier(Modifier::BOLD);
        if active {
            heading = heading.add_modifier(Modifier::UNDERLINED);
        }
        rows.push(
            Row::new(vec![
                Cell::from(category.label()),
                Cell::from(format_currency(aggregates.category_total(category))),
            ])
            .style(heading),
        );

        let items = ledger.items(category);
        if items.is_empty() {
            rows.push(Row::new(vec![Cell::from("  No items yet. Press a to add one.")]));
        }
        for (idx, item) in items.iter().enumerate() {
            let name = if item.name.is_empty() {
                "(unnamed)".to_string()
            } else {
                item.name.clone()
            };
            let mut row = Row::new(vec![
                Cell::from(format!("  {name}")),
                Cell::from(format_currency(item.amount)),
            ]);
            if active && idx == app.selected {
                row = row.style(Style::default().fg(Color::Black).bg(Color::Yellow));
            }
            rows.push(row);
        }
    }

    let table = Table::new(rows, [Constraint::Percentage(65), Constraint::Percentage(35)])
        .block(Block::default().title("Budget").borders(Borders::ALL));
    f.render_widget(table, area);
}

fn render_summary(f: &mut ratatui::Frame, area: Rect, aggregates: &Aggregates) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(9)].as_ref())
        .split(area);

    let status = if aggregates.is_within_budget() {
        "You are within your budget! Great job."
    } else {
        "You are overspending. Review your expenses."
    };
    let rate_color = if aggregates.meets_savings_target() {
        Color::Green
    } else {
        Color::Blue
    };
    let lines = vec![
        Line::from(format!("Income: {}", format_currency(aggregates.income))),
        Line::from(vec![Span::raw("Remaining: "), styled_net(aggregates.remaining)]),
        Line::from(status),
        Line::from(" "),
        Line::from(vec![
            Span::raw("Savings rate: "),
            Span::styled(
                format!("{:.1}%", aggregates.savings_rate),
                Style::default().fg(rate_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" (target {SAVINGS_RATE_TARGET:.0}%)")),
        ]),
        Line::from(format!(
            "Total outflow: {}",
            format_currency(aggregates.total_outflow)
        )),
        Line::from(format!(
            "Obligations (debts + expenses): {}",
            format_currency(aggregates.obligations())
        )),
        Line::from(format!(
            "Future growth (savings + investments): {}",
            format_currency(aggregates.future_growth())
        )),
    ];
    let summary = Paragraph::new(lines)
        .block(Block::default().title("This month").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(summary, chunks[0]);

    let labels: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("{} {}%", &c.label()[..3], aggregates.distribution_percent(*c)))
        .collect();
    let data: Vec<(&str, u64)> = Category::ALL
        .iter()
        .zip(labels.iter())
        .map(|(c, label)| (label.as_str(), aggregates.category_total(*c).max(0.0) as u64))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title("Distribution").borders(Borders::ALL))
        .bar_width(9)
        .data(&data)
        .value_style(Style::default().fg(Color::Yellow))
        .label_style(Style::default().fg(Color::White));
    f.render_widget(chart, chunks[1]);
}

fn render_projection(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let params = app.planner.investment_params();
    let projection = app.planner.projection();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4)].as_ref())
        .split(area);

    let lines = vec![
        Line::from(format!(
            "{} now + {}/mo at {:.2}% for {} years",
            format_currency(params.initial_principal),
            format_currency(params.monthly_contribution),
            params.annual_rate_percent,
            params.years
        )),
        Line::from(vec![
            Span::raw("Future value: "),
            Span::styled(
                format_currency(projection.total),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "Invested: {}  Interest: {}",
            format_currency(projection.total_invested),
            format_currency(projection.interest_earned)
        )),
        Line::from(format!(
            "From lump sum: {}  From contributions: {}",
            format_currency(projection.fv_initial),
            format_currency(projection.fv_contributions)
        )),
        Line::from(format!("Growth multiple: {:.2}x", projection.growth_multiple)),
    ];
    let summary = Paragraph::new(lines)
        .block(Block::default().title("Investment").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(summary, chunks[0]);

    let series = yearly_balances(params);
    let totals: Vec<(f64, f64)> = series.iter().map(|p| (p.year as f64, p.total)).collect();
    let invested: Vec<(f64, f64)> = series
        .iter()
        .map(|p| (p.year as f64, p.total_invested))
        .collect();
    let top = series
        .iter()
        .map(|p| p.total.max(p.total_invested))
        .fold(0.0, f64::max)
        .max(1.0);

    let datasets = vec![
        Dataset::default()
            .name("Balance")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Green))
            .data(&totals),
        Dataset::default()
            .name("Invested")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Gray))
            .data(&invested),
    ];
    let chart = Chart::new(datasets)
        .block(Block::default().title("Growth").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([1.0, f64::from(params.years.max(1))])
                .labels(vec![
                    Span::raw("1"),
                    Span::raw(params.years.max(1).to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, top])
                .labels(vec![Span::raw("0"), Span::raw(format_compact(top))]),
        );
    f.render_widget(chart, chunks[1]);
}

fn render_mortgage(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let params = app.planner.mortgage_params();
    let amortization = app.planner.amortization();

    let payment_label = if amortization.uses_custom_payment() {
        "Monthly payment (custom): "
    } else {
        "Monthly payment: "
    };
    let lines = vec![
        Line::from(format!(
            "Loan {} at {:.2}% over {} years",
            format_currency(amortization.principal),
            params.annual_rate_percent,
            params.years
        )),
        Line::from(vec![
            Span::raw(payment_label),
            Span::styled(
                format_currency(amortization.monthly_payment),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "  principal ~{}  interest ~{}",
            format_currency(amortization.principal_portion),
            format_currency(amortization.interest_portion)
        )),
        Line::from(format!(
            "Total paid: {}",
            format_currency(amortization.total_paid)
        )),
        Line::from(format!(
            "Total interest: {}",
            format_currency(amortization.total_interest)
        )),
        Line::from(format!(
            "Payoff: {}",
            amortization.payoff_date.format("%B %Y")
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Mortgage").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    if let Some(form) = &app.form {
        render_form(f, area, &form.title, form.fields.clone(), form.index);
        return;
    }

    let last_saved = app
        .last_save
        .map(|_| "Saved recently".to_string())
        .unwrap_or_default();
    let footer = Paragraph::new(vec![
        Line::from(
            "q quit  h/l category  j/k select  a add  e edit  d delete  i income  p projection  m mortgage  c custom payment  r reload",
        ),
        Line::from(vec![
            Span::styled(last_saved, Style::default().fg(Color::Gray)),
            Span::raw("  "),
            Span::styled(&app.last_message, Style::default().fg(Color::Yellow)),
        ]),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}

fn render_form(f: &mut ratatui::Frame, area: Rect, title: &str, fields: Vec<Field>, index: usize) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let label = if i == index {
            Span::styled(
                field.label,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw(field.label)
        };
        lines.push(Line::from(vec![
            label,
            Span::raw(": "),
            Span::raw(field.value.clone()),
        ]));
    }
    lines.push(Line::from("Enter: next/submit   Tab: next   Esc: cancel"));
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn format_currency(value: f64) -> String {
    if value.is_sign_negative() && value != 0.0 {
        format!("-${:.2}", value.abs())
    } else {
        format!("${:.2}", value.abs())
    }
}

/// Short axis label, e.g. `$271k` or `$1.2M`.
fn format_compact(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.0}k", value / 1_000.0)
    } else {
        format!("${value:.0}")
    }
}

/// Value pre-filled into an input field; drops a trailing `.0`.
fn format_input(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn styled_net(net: f64) -> Span<'static> {
    let color = if net >= 0.0 { Color::Green } else { Color::Red };
    Span::styled(format_currency(net), Style::default().fg(color))
}
