//! Canned demo strategy served when the upstream is unavailable and the
//! operator opted into graceful degradation. Tagged `"demo": true` so the UI
//! can visibly distinguish it from generated content.

use stratagem_core::types::StrategyDocument;

pub fn demo_strategy() -> StrategyDocument {
    let value = serde_json::json!({
        "demo": true,
        "projectName": "FocusFlow",
        "tagline": "A distraction-free planning workspace for small remote teams",
        "strategy": {
            "persona": "Remote team leads at 5-30 person startups juggling too many tools",
            "personaDetail": "Team leads who plan sprints across three or four disconnected apps. They value speed over configurability and abandon tools that need an onboarding call.",
            "problem": "Planning context is scattered across chat, docs and trackers",
            "problemDetail": "Every planning cycle starts with reassembling context from chat threads and stale documents. The cost is invisible but recurring, and it compounds as the team grows.",
            "objective": "Become the default weekly planning surface for small remote teams",
            "objectiveDetail": "Reach 1,000 weekly active teams within twelve months by winning the moment a team outgrows a shared doc but is not ready for heavyweight project software."
        },
        "product": {
            "concept": "One keyboard-driven board combining goals, tasks and notes",
            "conceptDetail": "A single surface where goals, tasks and meeting notes live together and link to each other. No per-project configuration, no required fields.",
            "feature1": "Weekly view that assembles itself from linked items",
            "feature1Detail": "The weekly view pulls in everything tagged for the week and groups it by goal, so preparation for the planning call takes minutes instead of an hour.",
            "feature2": "Inline summaries generated from the week's activity",
            "feature2Detail": "End-of-week summaries are drafted automatically from completed items and notes, ready to paste into the company update."
        },
        "stack": {
            "frontend": "React with a local-first sync layer",
            "frontendDetail": "Local-first keeps the board instant under poor connectivity, which remote teams hit constantly.",
            "backend": "Rust API with Postgres",
            "backendDetail": "A small, boring, operable backend. The sync protocol is the only clever part.",
            "partners": "Calendar and chat integrations first",
            "partnersDetail": "Calendar and chat are where planning context leaks from; integrations capture it at the source."
        },
        "planning": {
            "step1": "Private beta with ten design-partner teams",
            "step1Detail": "Hand-picked teams with weekly feedback calls. Success is retention, not praise.",
            "step2": "Self-serve launch with the weekly view as the hook",
            "step2Detail": "Launch narrative centres on the self-assembling weekly view, the one feature competitors cannot copy quickly.",
            "step3": "Team-plan monetisation once ten-week retention holds",
            "step3Detail": "Pricing flips on only after the retention curve flattens above 40 percent at week ten."
        },
        "competitors": {
            "competitor1": "Linear - polished tracker for product teams",
            "competitor1Detail": "Linear\n\nPolished issue tracker for product teams.\n\nPositioning: we win on planning context, not issue workflow.",
            "competitor2": "Notion - flexible docs that become sprawling",
            "competitor2Detail": "Notion\n\nFlexible workspace that sprawls as teams grow.\n\nPositioning: opinionated structure beats infinite flexibility for weekly planning.",
            "competitor3": "Trello - simple boards without goal linkage",
            "competitor3Detail": "Trello\n\nSimple kanban boards.\n\nPositioning: boards without goals go stale; ours assemble the week automatically.",
            "competitor4": "Monday - heavyweight configuration for larger orgs",
            "competitor4Detail": "Monday\n\nConfigurable work OS aimed at larger organisations.\n\nPositioning: zero-setup wins the under-30-person segment."
        }
    });

    match value {
        serde_json::Value::Object(fields) => StrategyDocument::new(fields),
        _ => unreachable!("demo document is a JSON object literal"),
    }
}
