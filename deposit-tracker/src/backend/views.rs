//! Server-rendered pages.

use axum::http::StatusCode;
use chrono::Datelike;
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::backend::forms::{BankForm, DepositForm, SettingsForm};
use crate::backend::session::Flash;
use crate::database::models::{Bank, DepositView, NewBank, Settings, Summary, User};
use crate::util::{fmt_currency, fmt_money, fmt_rate, iso};

pub const APP_NAME: &str = "Bank Deposit Management";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2933; background: #f5f7fa; }
header { background: #243b53; color: #fff; padding: .75rem 1.5rem; display: flex; gap: 1.25rem; align-items: center; }
header a { color: #fff; text-decoration: none; }
header .spacer { flex: 1; }
main { max-width: 70rem; margin: 1.5rem auto; padding: 0 1.5rem; }
table { border-collapse: collapse; width: 100%; background: #fff; }
th, td { padding: .5rem .75rem; border-bottom: 1px solid #d9e2ec; text-align: left; }
td.num, th.num { text-align: right; }
form.inline { display: inline; }
label { display: block; margin-top: .75rem; font-weight: 600; }
input, select { padding: .4rem; min-width: 16rem; }
button { margin-top: 1rem; padding: .45rem 1rem; }
.flash { padding: .75rem 1rem; margin-bottom: 1rem; border-radius: 4px; }
.flash.success { background: #e3f9e5; }
.flash.error, .errors { background: #ffe3e3; padding: .75rem 1rem; }
.flash.info { background: #e6f6ff; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(14rem, 1fr)); gap: 1rem; }
.card { background: #fff; padding: 1rem; border-radius: 4px; }
.card .value { font-size: 1.3rem; font-weight: 700; }
footer { text-align: center; color: #829ab1; padding: 2rem 0; }
"#;

/// Per-request page context.
pub struct Ctx<'a> {
    pub user: &'a User,
    pub flash: Option<Flash>,
}

fn layout(title: &str, user: Option<&User>, flash: Option<&Flash>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · " (APP_NAME) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    strong { (APP_NAME) }
                    @if let Some(user) = user {
                        a href="/" { "Deposits" }
                        a href="/deposits/add" { "Add deposit" }
                        a href="/summary" { "Summary" }
                        a href="/banks" { "Banks" }
                        a href="/settings" { "Settings" }
                        @if user.is_admin {
                            a href="/admin/users" { "Users" }
                        }
                        span.spacer {}
                        span { (user.username) }
                        a href="/logout" { "Log out" }
                    }
                }
                main {
                    @if let Some(f) = flash {
                        div class={ "flash " (f.kind.as_str()) } { (f.message) }
                    }
                    h1 { (title) }
                    (content)
                }
                footer { "© " (chrono::Local::now().year()) " " (APP_NAME) }
            }
        }
    }
}

fn page(ctx: &Ctx, title: &str, content: Markup) -> Markup {
    layout(title, Some(ctx.user), ctx.flash.as_ref(), content)
}

fn errors_box(errors: &[String]) -> Markup {
    html! {
        @if !errors.is_empty() {
            div.errors {
                ul {
                    @for e in errors {
                        li { (e) }
                    }
                }
            }
        }
    }
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(
        title,
        None,
        None,
        html! {
            p { (message) }
            p { a href="/" { "Back to deposits" } }
        },
    )
}

/* ========== Auth ========== */

pub fn login(flash: Option<&Flash>, error: Option<&str>, username: &str) -> Markup {
    layout(
        "Log in",
        None,
        flash,
        html! {
            @if let Some(e) = error {
                div.errors { (e) }
            }
            form method="post" action="/login" {
                label for="username" { "Username" }
                input #username type="text" name="username" value=(username) required autofocus;
                label for="password" { "Password" }
                input #password type="password" name="password" required;
                div { button type="submit" { "Log in" } }
            }
        },
    )
}

/* ========== Deposits ========== */

pub fn index(ctx: &Ctx, deposits: &[DepositView], settings: &Settings) -> Markup {
    let cur = |d: &rust_decimal::Decimal| fmt_currency(&settings.currency_symbol, d);
    page(
        ctx,
        "Deposits",
        html! {
            @if deposits.is_empty() {
                p { "No deposits yet. " a href="/deposits/add" { "Add the first one." } }
            } @else {
                table {
                    thead {
                        tr {
                            th { "Ref" }
                            th { "Account holder" }
                            th { "Bank" }
                            th.num { "Principal" }
                            th.num { "Rate" }
                            th { "Maturity date" }
                            th.num { "Interest after tax" }
                            th.num { "Maturity amount" }
                            th { "Status" }
                        }
                    }
                    tbody {
                        @for v in deposits {
                            tr {
                                td { a href={ "/deposits/" (v.deposit.id) } { (v.reference) } }
                                td { (v.deposit.account_holder) }
                                td { (v.deposit.bank_name) }
                                td.num { (cur(&v.deposit.principal_amount)) }
                                td.num { (fmt_rate(&v.deposit.interest_rate)) }
                                td { (iso(&v.deposit.maturity_date)) }
                                td.num { (cur(&v.figures.interest_after_tax)) }
                                td.num { (cur(&v.figures.maturity_total)) }
                                td { @if v.is_matured { "Matured" } @else { "Active" } }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn deposit_detail(ctx: &Ctx, v: &DepositView, settings: &Settings) -> Markup {
    let d = &v.deposit;
    let f = &v.figures;
    let sym = settings.currency_symbol.as_str();
    page(
        ctx,
        &format!("Deposit {}", v.reference),
        html! {
            table {
                tr { th { "Account holder" } td { (d.account_holder) } }
                tr { th { "Account number" } td { (d.account_number) } }
                tr { th { "Bank" } td { (d.bank_name) } }
                tr { th { "Principal" } td { (sym) " " (fmt_money(&d.principal_amount)) } }
                tr { th { "Interest rate" } td { (fmt_rate(&d.interest_rate)) " per year" } }
                tr { th { "Tax rate" } td { (fmt_rate(&d.tax_rate)) } }
                tr { th { "Deposit date" } td { (iso(&d.deposit_date)) } }
                tr { th { "Maturity date" } td { (iso(&d.maturity_date)) } }
                tr { th { "Period" } td { (f.days_period) " days (" (f.elapsed_years) " years)" } }
                tr { th { "Interest before tax" } td { (sym) " " (fmt_money(&f.interest_before_tax)) } }
                tr { th { "Tax" } td { (sym) " " (fmt_money(&f.tax_amount)) } }
                tr { th { "Interest after tax" } td { (sym) " " (fmt_money(&f.interest_after_tax)) } }
                tr { th { "Total at maturity" } td { strong { (sym) " " (fmt_money(&f.maturity_total)) } } }
                tr { th { "Daily interest" } td { (sym) " " (fmt_money(&f.daily_interest_before_tax)) " before tax, " (sym) " " (fmt_money(&f.daily_interest_after_tax)) " after tax" } }
                tr { th { "Status" } td { @if v.is_matured { "Matured" } @else { "Active" } } }
            }
            p {
                a href={ "/deposits/" (d.id) "/edit" } { "Edit" }
                " "
                form.inline method="post" action={ "/deposits/" (d.id) "/delete" } {
                    button type="submit" { "Delete" }
                }
            }
        },
    )
}

/// Target of a deposit or bank form.
pub enum FormMode {
    Add,
    Edit(i64),
}

pub fn deposit_form(ctx: &Ctx, mode: FormMode, form: &DepositForm, banks: &[NewBank], errors: &[String]) -> Markup {
    let (title, action) = match mode {
        FormMode::Add => ("Add deposit".to_string(), "/deposits/add".to_string()),
        FormMode::Edit(id) => (format!("Edit deposit DEP{:03}", id), format!("/deposits/{}/edit", id)),
    };
    let bank_known = banks.iter().any(|b| b.name == form.bank_name);
    page(
        ctx,
        &title,
        html! {
            (errors_box(errors))
            form method="post" action=(action) {
                label for="account_holder" { "Account holder" }
                input #account_holder type="text" name="account_holder" value=(form.account_holder);
                label for="account_number" { "Account number" }
                input #account_number type="text" name="account_number" value=(form.account_number);
                label for="bank_name" { "Bank" }
                select #bank_name name="bank_name" {
                    option value="" { "Select a bank" }
                    @for b in banks {
                        option value=(b.name) selected[b.name == form.bank_name] {
                            (b.name) " (" (fmt_rate(&b.default_interest_rate)) ")"
                        }
                    }
                    @if !bank_known && !form.bank_name.is_empty() {
                        option value=(form.bank_name) selected { (form.bank_name) }
                    }
                }
                label for="principal_amount" { "Principal amount" }
                input #principal_amount type="text" inputmode="decimal" name="principal_amount" value=(form.principal_amount);
                label for="interest_rate" { "Annual interest rate (%)" }
                input #interest_rate type="text" inputmode="decimal" name="interest_rate" value=(form.interest_rate) placeholder="bank default";
                label for="tax_rate" { "Tax rate (%)" }
                input #tax_rate type="text" inputmode="decimal" name="tax_rate" value=(form.tax_rate);
                label for="deposit_date" { "Deposit date" }
                input #deposit_date type="date" name="deposit_date" value=(form.deposit_date);
                label for="maturity_date" { "Maturity date" }
                input #maturity_date type="date" name="maturity_date" value=(form.maturity_date);
                div { button type="submit" { "Save" } }
            }
        },
    )
}

pub fn summary(ctx: &Ctx, s: &Summary, settings: &Settings) -> Markup {
    let cur = |d: &rust_decimal::Decimal| fmt_currency(&settings.currency_symbol, d);
    page(
        ctx,
        "Summary",
        html! {
            div.cards {
                div.card { div { "Deposits" } div.value { (s.total_deposits) } }
                div.card { div { "Active" } div.value { (s.active_deposits) } }
                div.card { div { "Matured" } div.value { (s.matured_deposits) } }
                div.card { div { "Total principal" } div.value { (cur(&s.total_principal)) } }
                div.card { div { "Interest before tax" } div.value { (cur(&s.total_interest_before_tax)) } }
                div.card { div { "Tax paid" } div.value { (cur(&s.total_tax_paid)) } }
                div.card { div { "Interest after tax" } div.value { (cur(&s.total_interest_after_tax)) } }
                div.card { div { "Total at maturity" } div.value { (cur(&s.total_maturity_amount)) } }
                div.card { div { "Average rate" } div.value { (fmt_rate(&s.average_interest_rate)) } }
            }
        },
    )
}

/* ========== Banks ========== */

pub fn banks(ctx: &Ctx, banks: &[Bank], form: &BankForm, errors: &[String]) -> Markup {
    page(
        ctx,
        "Banks",
        html! {
            @if banks.is_empty() {
                p { "No banks yet." }
            } @else {
                table {
                    thead { tr { th { "Name" } th.num { "Default rate" } th {} } }
                    tbody {
                        @for b in banks {
                            tr {
                                td { (b.name) }
                                td.num { (fmt_rate(&b.default_interest_rate)) }
                                td {
                                    a href={ "/banks/" (b.id) "/edit" } { "Edit" }
                                    " "
                                    form.inline method="post" action={ "/banks/" (b.id) "/delete" } {
                                        button type="submit" { "Delete" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            h2 { "Add bank" }
            (errors_box(errors))
            (bank_fields("/banks/add", form))
        },
    )
}

pub fn bank_form(ctx: &Ctx, id: i64, form: &BankForm, errors: &[String]) -> Markup {
    page(
        ctx,
        "Edit bank",
        html! {
            (errors_box(errors))
            (bank_fields(&format!("/banks/{}/edit", id), form))
        },
    )
}

fn bank_fields(action: &str, form: &BankForm) -> Markup {
    html! {
        form method="post" action=(action) {
            label for="name" { "Name" }
            input #name type="text" name="name" value=(form.name);
            label for="default_interest_rate" { "Default annual interest rate (%)" }
            input #default_interest_rate type="text" inputmode="decimal" name="default_interest_rate" value=(form.default_interest_rate);
            div { button type="submit" { "Save" } }
        }
    }
}

/* ========== Settings ========== */

pub fn settings(ctx: &Ctx, form: &SettingsForm, errors: &[String]) -> Markup {
    page(
        ctx,
        "Settings",
        html! {
            (errors_box(errors))
            form method="post" action="/settings" {
                label for="default_tax_rate" { "Default tax rate (%)" }
                input #default_tax_rate type="text" inputmode="decimal" name="default_tax_rate" value=(form.default_tax_rate);
                label for="currency_symbol" { "Currency symbol" }
                input #currency_symbol type="text" name="currency_symbol" value=(form.currency_symbol);
                div { button type="submit" { "Save" } }
            }
        },
    )
}

/* ========== Admin ========== */

pub fn admin_users(ctx: &Ctx, users: &[User]) -> Markup {
    page(
        ctx,
        "Users",
        html! {
            table {
                thead { tr { th { "Username" } th { "Role" } th { "Created" } th { "Reset password" } th {} } }
                tbody {
                    @for u in users {
                        tr {
                            td { (u.username) }
                            td { @if u.is_admin { "Admin" } @else { "User" } }
                            td { (u.created_at.format("%Y-%m-%d")) }
                            td {
                                form.inline method="post" action={ "/admin/users/" (u.id) "/password" } {
                                    input type="password" name="new_password" placeholder="new password" required;
                                    button type="submit" { "Set" }
                                }
                            }
                            td {
                                @if u.id != ctx.user.id {
                                    form.inline method="post" action={ "/admin/users/" (u.id) "/delete" } {
                                        button type="submit" { "Delete" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            h2 { "Add user" }
            form method="post" action="/admin/users/add" {
                label for="username" { "Username" }
                input #username type="text" name="username" required;
                label for="password" { "Password" }
                input #password type="password" name="password" required;
                label { input type="checkbox" name="is_admin"; " Administrator" }
                div { button type="submit" { "Create" } }
            }
        },
    )
}
