use anyhow::Context;
use tera::Tera;

const GENERATION_TEMPLATE: &str = "\
You are an expert in creating {{ doc_type }} documents. \
Generate a comprehensive {{ doc_type }} document based on the following information:

Document Type: {{ doc_type }}
Project Summary: {{ summary }}
Requirements:
{{ requirements }}
Style Profile:
{{ style_profile }}
Context Examples:
{{ context }}

Ensure the document follows professional standards with proper sections, \
formatting, and technical accuracy. Use markdown formatting with appropriate \
headers, lists, and code blocks where necessary.";

const FORMATTING_REVIEW_TEMPLATE: &str = "\
You are an expert editor specializing in technical document formatting and style. \
Review and improve the following document content:

Content to review:
{{ content }}

Style profile:
{{ style_profile }}

Please ensure:
1. Proper Markdown formatting with consistent headers
2. Correct section numbering
3. Well-aligned tables
4. Standardized code blocks
5. Professional tone and clarity

Return ONLY the improved content in proper Markdown format.";

const FEEDBACK_REVIEW_TEMPLATE: &str = "\
You are an expert editor addressing specific feedback on a document. \
Review and improve the following content based on the feedback provided:

Content to review:
{{ content }}

Feedback to address:
{{ feedback }}

Please address all feedback points while maintaining document quality and formatting.
Return ONLY the improved content in proper Markdown format.";

/// Prompt template engine with the generation and review templates
/// registered at construction.
pub struct PromptEngine {
    tera: Tera,
}

impl PromptEngine {
    pub fn new() -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("generate", GENERATION_TEMPLATE)
            .context("register generation template")?;
        tera.add_raw_template("review_formatting", FORMATTING_REVIEW_TEMPLATE)
            .context("register formatting review template")?;
        tera.add_raw_template("review_feedback", FEEDBACK_REVIEW_TEMPLATE)
            .context("register feedback review template")?;
        Ok(Self { tera })
    }

    pub fn render_generation(
        &self,
        doc_type: &str,
        summary: &str,
        requirements: &str,
        style_profile: &str,
        context: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("doc_type", doc_type);
        ctx.insert("summary", summary);
        ctx.insert("requirements", requirements);
        ctx.insert("style_profile", style_profile);
        ctx.insert("context", context);
        self.tera
            .render("generate", &ctx)
            .context("render generation prompt")
    }

    pub fn render_formatting_review(
        &self,
        content: &str,
        style_profile: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("content", content);
        ctx.insert("style_profile", style_profile);
        self.tera
            .render("review_formatting", &ctx)
            .context("render formatting review prompt")
    }

    pub fn render_feedback_review(
        &self,
        content: &str,
        feedback: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("content", content);
        ctx.insert("feedback", feedback);
        self.tera
            .render("review_feedback", &ctx)
            .context("render feedback review prompt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_prompt_carries_all_inputs() {
        let engine = PromptEngine::new().unwrap();
        let prompt = engine
            .render_generation(
                "SRS",
                "Inventory system",
                "- track stock\n- barcode scanning",
                "Writing Style: Professional",
                "Example 1:\nPrior content",
            )
            .unwrap();
        assert!(prompt.contains("Document Type: SRS"));
        assert!(prompt.contains("Project Summary: Inventory system"));
        assert!(prompt.contains("- track stock"));
        assert!(prompt.contains("Writing Style: Professional"));
        assert!(prompt.contains("Prior content"));
    }

    #[test]
    fn formatting_review_prompt_contains_markers() {
        let engine = PromptEngine::new().unwrap();
        let prompt = engine
            .render_formatting_review("# Doc\nbody", "tone: technical")
            .unwrap();
        assert!(prompt.contains("Content to review:"));
        assert!(prompt.contains("Style profile:"));
        assert!(prompt.contains("# Doc"));
    }

    #[test]
    fn feedback_review_prompt_contains_markers() {
        let engine = PromptEngine::new().unwrap();
        let prompt = engine
            .render_feedback_review("# Doc", "- add a timeline section")
            .unwrap();
        assert!(prompt.contains("Feedback to address:"));
        assert!(prompt.contains("- add a timeline section"));
    }

    #[test]
    fn markdown_content_is_not_escaped() {
        let engine = PromptEngine::new().unwrap();
        let prompt = engine
            .render_formatting_review("**bold** & <em>", "style")
            .unwrap();
        assert!(prompt.contains("**bold** & <em>"));
    }
}
