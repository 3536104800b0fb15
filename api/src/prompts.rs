//! Prompt templates. These are opaque text builders: each one maps caller
//! input to a request that instructs the model to answer with a JSON object
//! matching the documented category schema. The copy is not a contract; the
//! JSON key names are, because the renderer looks them up.

use stratagem_core::types::StrategyDocument;

/// The six strategy categories generated in parallel by the streaming route.
/// Each category is one independent completion call with its own retry loop
/// and failure domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Vision,
    Solution,
    Model,
    Growth,
    Unicorn,
    Insights,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Vision,
        Category::Solution,
        Category::Model,
        Category::Growth,
        Category::Unicorn,
        Category::Insights,
    ];

    /// Tag used in stream events and error payloads.
    pub fn name(self) -> &'static str {
        match self {
            Category::Vision => "vision",
            Category::Solution => "solution",
            Category::Model => "model",
            Category::Growth => "growth",
            Category::Unicorn => "unicorn",
            Category::Insights => "insights",
        }
    }

    pub fn prompt(self, idea: &str, project_name: &str) -> String {
        let (section, structure) = match self {
            Category::Vision => (
                "VISION",
                r#"{
  "strategy": {
    "vision": "Main vision (5-8 words)",
    "visionDetail": "Expanded vision (2-3 sentences)",
    "mission": "Mission statement (5-8 words)",
    "missionDetail": "Expanded mission (2-3 sentences)",
    "values": "Core values (5-8 words)",
    "valuesDetail": "Expanded values (2-3 sentences)"
  },
  "marketStudy": {
    "marketSize": "Market size estimate (5-8 words)",
    "marketSizeDetail": "Market sizing rationale (2-3 sentences)",
    "competition": "Competitive landscape (5-8 words)",
    "competitionDetail": "Competitive analysis (2-3 sentences)",
    "opportunity": "Key opportunity (5-8 words)",
    "opportunityDetail": "Why now (2-3 sentences)"
  }
}"#,
            ),
            Category::Solution => (
                "SOLUTION",
                r#"{
  "mvp": {
    "concept": "Product concept (5-8 words)",
    "conceptDetail": "Concept explanation (2-3 sentences)",
    "coreFeature1": "First core feature (5-8 words)",
    "coreFeature1Detail": "Feature explanation (2-3 sentences)",
    "coreFeature2": "Second core feature (5-8 words)",
    "coreFeature2Detail": "Feature explanation (2-3 sentences)",
    "coreFeature3": "Third core feature (5-8 words)",
    "coreFeature3Detail": "Feature explanation (2-3 sentences)",
    "userExperience": "UX principle (5-8 words)",
    "userExperienceDetail": "UX rationale (2-3 sentences)"
  }
}"#,
            ),
            Category::Model => (
                "MODEL",
                r#"{
  "businessModel": {
    "revenueStreams": "Revenue streams (5-8 words)",
    "revenueStreamsDetail": "Revenue explanation (2-3 sentences)",
    "pricingStrategy": "Pricing strategy (5-8 words)",
    "pricingStrategyDetail": "Pricing rationale (2-3 sentences)",
    "unitEconomics": "Unit economics (5-8 words)",
    "unitEconomicsDetail": "Economics rationale (2-3 sentences)"
  },
  "techStack": {
    "frontend": "Frontend choice (3-6 words)",
    "frontendDetail": "Frontend rationale (2-3 sentences)",
    "backend": "Backend choice (3-6 words)",
    "backendDetail": "Backend rationale (2-3 sentences)",
    "aiTools": "AI tooling (3-6 words)",
    "aiToolsDetail": "AI tooling rationale (2-3 sentences)"
  }
}"#,
            ),
            Category::Growth => (
                "GROWTH",
                r#"{
  "launchTimeline": {
    "phase1": "First phase (5-8 words)",
    "phase1Detail": "Phase details (2-3 sentences)",
    "phase2": "Second phase (5-8 words)",
    "phase2Detail": "Phase details (2-3 sentences)",
    "phase3": "Third phase (5-8 words)",
    "phase3Detail": "Phase details (2-3 sentences)"
  },
  "growthStrategy": {
    "acquisitionChannels": "Acquisition channels (5-8 words)",
    "acquisitionChannelsDetail": "Channel rationale (2-3 sentences)",
    "retentionStrategy": "Retention strategy (5-8 words)",
    "retentionStrategyDetail": "Retention rationale (2-3 sentences)",
    "scalingPlan": "Scaling plan (5-8 words)",
    "scalingPlanDetail": "Scaling rationale (2-3 sentences)"
  }
}"#,
            ),
            Category::Unicorn => (
                "UNICORN",
                r#"{
  "kpis": {
    "northStarMetric": "North star metric (3-6 words)",
    "northStarMetricDetail": "Metric rationale (2-3 sentences)",
    "acquisitionMetrics": "Acquisition metrics (3-6 words)",
    "acquisitionMetricsDetail": "Metric rationale (2-3 sentences)",
    "engagementMetrics": "Engagement metrics (3-6 words)",
    "engagementMetricsDetail": "Metric rationale (2-3 sentences)"
  },
  "aiAgents": {
    "agent1": "First AI agent role (3-6 words)",
    "agent1Detail": "What it automates (2-3 sentences)",
    "agent1Impact": "Expected impact (5-8 words)",
    "agent2": "Second AI agent role (3-6 words)",
    "agent2Detail": "What it automates (2-3 sentences)",
    "agent2Impact": "Expected impact (5-8 words)",
    "agent3": "Third AI agent role (3-6 words)",
    "agent3Detail": "What it automates (2-3 sentences)",
    "agent3Impact": "Expected impact (5-8 words)"
  }
}"#,
            ),
            Category::Insights => (
                "INSIGHTS",
                r#"{
  "similarCompanies": {
    "company1": "Real comparable company 1",
    "company1Detail": "One key lesson (max 10 words)",
    "company2": "Real comparable company 2",
    "company2Detail": "One key lesson (max 10 words)",
    "company3": "Real comparable company 3",
    "company3Detail": "One key lesson (max 10 words)"
  },
  "learnings": {
    "marketValidation": "Market insight (3-5 words)",
    "marketValidationDetail": "One sentence (max 10 words)",
    "competitiveAdvantage": "Advantage (3-5 words)",
    "competitiveAdvantageDetail": "One sentence (max 10 words)",
    "keyLearnings": "Main lesson (3-5 words)",
    "keyLearningsDetail": "One sentence (max 10 words)"
  }
}"#,
            ),
        };

        format!(
            "You are a strategic business advisor. Based on this startup idea, generate \
             the {section} section in JSON format.\n\n\
             Startup idea: \"{idea}\"\n\
             Project name: \"{project_name}\"\n\n\
             CRITICAL: Return ONLY valid JSON with NO markdown formatting (no **, no *, no links). \
             Start directly with {{ and end with }}. Do NOT use markdown in text values.\n\n\
             Structure:\n{structure}\n\n\
             Be strategic, specific, and future-focused."
        )
    }
}

/// First call of the streaming flow: a short project summary whose
/// `projectName` seeds every category prompt.
pub fn summary_prompt(idea: &str) -> String {
    format!(
        "You are a strategic business advisor. Based on this startup idea, generate ONLY \
         a project summary in JSON format.\n\n\
         Startup idea: \"{idea}\"\n\n\
         CRITICAL: Return ONLY valid JSON with NO markdown formatting (no **, no *, no links). \
         Start directly with {{ and end with }}. Do NOT use markdown in text values.\n\n\
         Structure:\n\
         {{\n  \"projectName\": \"Short catchy name (2-4 words)\",\n  \"tagline\": \"One-line description (max 10 words)\"\n}}\n\n\
         Be strategic, specific, and future-focused."
    )
}

/// The single-shot full-strategy prompt used by POST /v1/strategy.
pub fn strategy_prompt(idea: &str) -> String {
    format!(
        "You are an expert in business strategy and startup creation. From the following \
         idea, generate a complete strategy in JSON format.\n\n\
         IDEA: \"{idea}\"\n\n\
         You must return ONLY a valid JSON object (no markdown, no text before or after) \
         with this EXACT structure:\n\n\
         {{\n\
         \x20 \"projectName\": \"Short project name (2-4 words max)\",\n\
         \x20 \"tagline\": \"Short description of the idea (15-20 words max)\",\n\
         \x20 \"strategy\": {{\n\
         \x20   \"persona\": \"Target persona (15-20 words)\",\n\
         \x20   \"personaDetail\": \"Detailed persona analysis: demographics, behaviours, needs, motivations (2-3 paragraphs)\",\n\
         \x20   \"problem\": \"Problem solved (15-20 words)\",\n\
         \x20   \"problemDetail\": \"Problem deep-dive: context, impact, why it matters (2-3 paragraphs)\",\n\
         \x20   \"objective\": \"Main objective (15-20 words)\",\n\
         \x20   \"objectiveDetail\": \"Objective details: metrics, timeline, long-term vision (2-3 paragraphs)\"\n\
         \x20 }},\n\
         \x20 \"product\": {{\n\
         \x20   \"concept\": \"Product concept (15-20 words)\",\n\
         \x20   \"conceptDetail\": \"Full concept: value added, differentiation, positioning (2-3 paragraphs)\",\n\
         \x20   \"feature1\": \"Key feature 1 (10-15 words)\",\n\
         \x20   \"feature1Detail\": \"Feature 1 details: how it works, user benefits (2-3 paragraphs)\",\n\
         \x20   \"feature2\": \"Key feature 2 (10-15 words)\",\n\
         \x20   \"feature2Detail\": \"Feature 2 details: how it works, user benefits (2-3 paragraphs)\"\n\
         \x20 }},\n\
         \x20 \"stack\": {{\n\
         \x20   \"frontend\": \"Frontend technologies (5-10 words)\",\n\
         \x20   \"frontendDetail\": \"Frontend rationale: ecosystem, scalability (2-3 paragraphs)\",\n\
         \x20   \"backend\": \"Backend technologies (5-10 words)\",\n\
         \x20   \"backendDetail\": \"Backend rationale: performance, security, integrations (2-3 paragraphs)\",\n\
         \x20   \"partners\": \"Key partners (5-10 words)\",\n\
         \x20   \"partnersDetail\": \"Partner roles: integrations, added value (2-3 paragraphs)\"\n\
         \x20 }},\n\
         \x20 \"planning\": {{\n\
         \x20   \"step1\": \"First step (10-15 words)\",\n\
         \x20   \"step1Detail\": \"Step 1 details: tasks, deliverables, risks (2-3 paragraphs)\",\n\
         \x20   \"step2\": \"Second step (10-15 words)\",\n\
         \x20   \"step2Detail\": \"Step 2 details: tasks, deliverables, risks (2-3 paragraphs)\",\n\
         \x20   \"step3\": \"Third step (10-15 words)\",\n\
         \x20   \"step3Detail\": \"Step 3 details: tasks, deliverables, risks (2-3 paragraphs)\"\n\
         \x20 }}\n\
         }}\n\n\
         IMPORTANT:\n\
         - Respond ONLY with the JSON, nothing else\n\
         - Short texts must be SHORT (max 20 words)\n\
         - \"Detail\" texts must be LONG and DETAILED (2-3 paragraphs of 3-4 sentences each)\n\
         - Be concrete, actionable and professional"
    )
}

/// Second call of the full-strategy flow: competitor analysis, seeded with
/// context lifted from the freshly generated document.
pub fn competitor_prompt(idea: &str, strategy: &StrategyDocument) -> String {
    let persona = nested_str(strategy, "strategy", "persona");
    let problem = nested_str(strategy, "strategy", "problem");
    let concept = nested_str(strategy, "product", "concept");

    format!(
        "You are an expert in competitive analysis and market research. From the following \
         idea, find 4 to 10 relevant direct or indirect competitors.\n\n\
         IDEA: \"{idea}\"\n\n\
         CONTEXT:\n\
         - Persona: {persona}\n\
         - Problem solved: {problem}\n\
         - Product: {concept}\n\n\
         You must return ONLY a valid JSON object with this EXACT structure:\n\
         {{\n\
         \x20 \"competitors\": [\n\
         \x20   {{\n\
         \x20     \"name\": \"Competitor name (e.g. 'Notion', 'Figma')\",\n\
         \x20     \"description\": \"Short description and why it is relevant (15-25 words)\",\n\
         \x20     \"url\": \"Main landing page URL, or null if unknown\",\n\
         \x20     \"pitch\": \"What this competitor does and its value proposition (20-30 words)\",\n\
         \x20     \"positioning\": \"How to differentiate against this competitor (15-20 words)\"\n\
         \x20   }}\n\
         \x20 ]\n\
         }}\n\n\
         IMPORTANT:\n\
         - Find between 4 and 10 HIGHLY RELEVANT competitors\n\
         - Include direct (same problem) and indirect (similar problem) competitors\n\
         - URLs must be main landing pages, valid or null\n\
         - Respond ONLY with the JSON, nothing else"
    )
}

/// System prompt for the node refinement chat: the model advises on one
/// element of the tree, given its current title and content.
pub fn node_chat_system_prompt(node_title: &str, node_content: &str) -> String {
    format!(
        "You are a business strategy expert who helps refine and improve strategy elements.\n\n\
         Current context:\n\
         - Element: {node_title}\n\
         - Current content: {node_content}\n\n\
         Your mission:\n\
         - Respond concisely and actionably (2-3 sentences max)\n\
         - Propose concrete improvements\n\
         - Ask relevant questions to refine the strategy\n\
         - Be constructive and encouraging\n\n\
         Respond in English in a professional but accessible manner."
    )
}

fn nested_str<'a>(doc: &'a StrategyDocument, section: &str, key: &str) -> &'a str {
    doc.get(section)
        .and_then(|value| value.get(key))
        .and_then(|value| value.as_str())
        .unwrap_or("Not specified")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prompts_embed_idea_and_project_name() {
        for category in Category::ALL {
            let prompt = category.prompt("a plant-care app", "Verdant");
            assert!(prompt.contains("a plant-care app"), "{:?}", category);
            assert!(prompt.contains("Verdant"), "{:?}", category);
            assert!(prompt.contains("ONLY valid JSON"), "{:?}", category);
        }
    }

    #[test]
    fn category_names_are_stable_stream_tags() {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            ["vision", "solution", "model", "growth", "unicorn", "insights"]
        );
    }

    #[test]
    fn competitor_prompt_lifts_context_from_document() {
        let doc: StrategyDocument = serde_json::from_str(
            r#"{"strategy":{"persona":"indie devs","problem":"tool sprawl"},"product":{"concept":"one dashboard"}}"#,
        )
        .unwrap();
        let prompt = competitor_prompt("a dev dashboard", &doc);
        assert!(prompt.contains("indie devs"));
        assert!(prompt.contains("tool sprawl"));
        assert!(prompt.contains("one dashboard"));
    }

    #[test]
    fn competitor_prompt_survives_missing_context() {
        let doc: StrategyDocument = serde_json::from_str("{}").unwrap();
        let prompt = competitor_prompt("an idea", &doc);
        assert!(prompt.contains("Not specified"));
    }
}
