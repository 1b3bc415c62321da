//! JavaScript executed inside the scraped page
//!
//! All extraction runs as one script per query so a collection cycle costs a
//! handful of WebDriver round-trips instead of hundreds of per-element
//! calls. Scripts return plain JSON; all interpretation happens in Rust
//! (see `inspector`), so markup drift means editing selector lists here, not
//! logic.

/// Probe the page's authentication state.
///
/// Returns `{url, loginForm, loggedIn, hasAuthToken}`.
pub const LOGIN_PROBE: &str = r##"
const loginForm = !!document.querySelector(
  "form#loginForm, form[name='login'], input[type='password']"
);
const loggedIn = !!document.querySelector(
  "#mainContainer, .webclient-shell, [data-qa='user-avatar'], .sidebar-nav"
);
let hasAuthToken = false;
try {
  hasAuthToken = Object.keys(window.localStorage)
    .some((key) => /token|auth|session/i.test(key));
} catch (err) { /* storage access can be denied on the login origin */ }
return { url: window.location.href, loginForm, loggedIn, hasAuthToken };
"##;

/// Collect raw status signals from the prioritized selector list.
///
/// Returns an array of `{classNames, text, attributes}` in selector
/// priority order; selectors that match nothing contribute no entry.
pub const STATUS_PROBE: &str = r#"
const selectors = [
  "[data-qa='my-status'] .status-indicator",
  ".user-status .status-dot",
  ".avatar-status",
  ".my-profile .status-text",
  "[class*='presence-']",
];
const signals = [];
for (const selector of selectors) {
  const el = document.querySelector(selector);
  if (!el) continue;
  const attributes = {};
  for (const name of ["data-status", "title", "aria-label"]) {
    const value = el.getAttribute(name);
    if (value) attributes[name] = value;
  }
  signals.push({
    classNames: Array.from(el.classList),
    text: (el.textContent || "").trim(),
    attributes,
  });
}
return signals;
"#;

/// Read the call-queue statistics table as a header/value cell pair.
///
/// Returns `{present, headers, values}`; `present` is false when the table
/// structure is absent from the current view.
pub const STATS_TABLE: &str = r#"
const table = document.querySelector(
  ".queue-statistics table, #callStatsTable, [data-qa='queue-stats'] table"
);
if (!table) return { present: false, headers: [], values: [] };
const headerCells = table.querySelectorAll("thead th, tr:first-child th");
const valueCells = table.querySelectorAll("tbody tr:first-child td, tr:nth-child(2) td");
const text = (cell) => (cell.textContent || "").trim();
return {
  present: true,
  headers: Array.from(headerCells, text),
  values: Array.from(valueCells, text),
};
"#;

/// Read the all-agents roster.
///
/// Returns `{present, rows}` where each row is
/// `{number, name, classes, queues}`; `present` is false when the roster
/// container is absent (distinct from an empty roster).
pub const ROSTER: &str = r#"
const container = document.querySelector(
  ".agents-list, [data-qa='agents-panel'], #switchboardAgents"
);
if (!container) return { present: false, rows: [] };
const rows = [];
for (const item of container.querySelectorAll(".agent-row, li[data-extension], tr[data-extension]")) {
  const indicator = item.querySelector(".status-indicator, .status-dot, [class*='status-']");
  const queueNodes = item.querySelectorAll(".queue-badge, .queue-name");
  rows.push({
    number: (item.getAttribute("data-extension")
      || (item.querySelector(".extension, .agent-number") || {}).textContent
      || "").trim(),
    name: ((item.querySelector(".agent-name, .name") || {}).textContent || "").trim(),
    classes: indicator ? Array.from(indicator.classList) : [],
    queues: Array.from(queueNodes, (node) => (node.textContent || "").trim()),
  });
}
return { present: true, rows };
"#;

/// Install the relevance-filtered mutation observer.
///
/// Idempotent: re-running it on an already-instrumented page is a no-op.
pub const OBSERVER_INSTALL: &str = r##"
if (window.__presenceObserver) return true;
const target = document.querySelector("#mainContainer, .webclient-shell") || document.body;
window.__presenceMutated = false;
window.__presenceObserver = new MutationObserver((mutations) => {
  for (const mutation of mutations) {
    const node = mutation.target;
    if (node.closest && node.closest(
      ".agents-list, .queue-statistics, .status-indicator, .user-status, [data-qa='my-status']"
    )) {
      window.__presenceMutated = true;
      return;
    }
  }
});
window.__presenceObserver.observe(target, {
  subtree: true,
  childList: true,
  attributes: true,
  attributeFilter: ["class", "data-status"],
});
return true;
"##;

/// Consume the mutation flag set by the observer.
pub const TAKE_MUTATION_FLAG: &str = r#"
const mutated = window.__presenceMutated === true;
window.__presenceMutated = false;
return mutated;
"#;

/// Last-resort navigation: scan interactive elements' visible text for the
/// given keywords and click the first match. Returns whether a click
/// happened.
pub const CLICK_BY_TEXT: &str = r#"
const keywords = arguments[0];
const nodes = document.querySelectorAll("a, button, [role='button'], [role='tab']");
for (const node of nodes) {
  const text = (node.textContent || "").toLowerCase();
  if (keywords.some((keyword) => text.includes(keyword))) {
    node.click();
    return true;
  }
}
return false;
"#;
