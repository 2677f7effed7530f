/// Summary prompt for a paper or one chunk of it
pub const SUMMARY_TEMPLATE: &str = "\
You are a PhD student tasked with summarizing an academic paper.
Read the following text carefully and provide a comprehensive summary that includes:
1. Main research question/objective
2. Key methodology used
3. Primary findings
4. Theoretical contributions
5. Limitations mentioned

Be thorough but concise. Focus on the academic rigor and scientific content.

Text to summarize:
{text}
";

/// Merges the summaries of a paper's chunks into one
pub const COMBINE_TEMPLATE: &str = "\
You are a PhD student who has summarized different sections of an academic paper.
Now combine these section summaries into one coherent overall summary:

Section summaries:
{summaries}

Please provide a unified, comprehensive summary:
";

pub const REFINE_TEMPLATE: &str = "\
You are a Postdoc researcher reviewing a PhD student's summary of an academic paper.
Your task is to refine and improve the summary by:
1. Ensuring all key points are captured accurately
2. Adding any missing critical information
3. Improving clarity and academic precision
4. Correcting any misinterpretations
5. Enhancing the theoretical depth

Original summary:
{summary}

Please provide a refined and improved version:
";

/// Cross-paper analysis of theoretical convergences and divergences
pub const ANALYSIS_TEMPLATE: &str = "\
You are a senior Professor conducting a meta-analysis of academic literature that will be \
compared with a REVIEW PAPER. Identify the most significant theoretical convergences and \
divergences that a comprehensive review should address.

CONVERGENT THEORETICAL PATTERNS (aim for 5-10 established consensus areas):
- Propositions that have achieved strong consensus across multiple studies
- Frameworks and conceptual models widely accepted in the field
- Shared conceptual definitions and theoretical constructs
- Principles consistently validated across different contexts

DIVERGENT THEORETICAL DEBATES (aim for 5-10 ongoing conflicts):
- Papers using the SAME framework but reaching OPPOSITE conclusions
- Direct contradictions in the interpretation of key concepts or phenomena
- Competing models explaining the same phenomena
- Unresolved disputes about fundamental mechanisms
- Studies that explicitly challenge established positions

FOCUS ON theoretical agreements and disagreements, conceptual consensus versus debate, and \
competing frameworks. IGNORE methodological differences, geographical contexts and empirical \
approaches unless they amount to a fundamental theoretical disagreement.

Here are the refined summaries to analyze:
{summaries}

CRITICAL INSTRUCTION: Focus on where papers make conflicting claims about the same phenomena, \
causal mechanisms, theoretical predictions, policy recommendations, or interpretations of \
similar evidence.

Provide a focused analysis identifying the key theoretical consensus areas and ongoing \
theoretical debates that a review paper should address:
";

/// Compares the main paper's discussion against the reference analysis
pub const COMPARISON_TEMPLATE: &str = "\
You are a senior Professor comparing a REVIEW PAPER with the theoretical convergences and \
divergences established from its reference literature.

This is a REVIEW/THEORETICAL PAPER, not an empirical study: evaluate theoretical synthesis and \
literature integration rather than empirical findings.

THEORETICAL SYNTHESIS: How comprehensively does the review capture the established \
convergences? Does it represent the key divergences? Which debates or consensus areas does it \
overlook?

LITERATURE INTEGRATION: How well does it integrate conflicting perspectives and give balanced \
representation to competing positions?

THEORETICAL POSITIONING: What stance does it take on existing debates? Does it propose \
resolutions to the fragmentation found in the literature?

CONCEPTUAL CONTRIBUTION: Does it develop new frameworks or models? What does it contribute \
beyond summarizing existing work?

CRITICAL EVALUATION: Strengths, weaknesses, and gaps, including future research directions it \
fails to address.

MAIN PAPER DISCUSSION/CONCLUSION:
{main_paper}

REFERENCE LITERATURE ANALYSIS (Convergences and Divergences):
{reference_insights}

Provide a focused comparison emphasizing theoretical synthesis and review quality:
";

pub const REPORT_TEMPLATE: &str = "\
# REVIEW PAPER ANALYSIS REPORT
Generated by AutoScholar on {generated_at}

## EXECUTIVE SUMMARY
This report analyzes a review paper against its reference literature, focusing on the most \
significant theoretical convergences and divergences and on how the review synthesizes them.

## REFERENCE LITERATURE ANALYSIS
{analysis}

## COMPARISON WITH THE REVIEW PAPER
{comparison}

---
Report generated by the AutoScholar academic analysis pipeline
";

/// Substitute `{name}` placeholders in one left-to-right pass over the template.
///
/// Inserted values are never scanned again, so text that happens to contain a
/// placeholder (a paper quoting `{comparison}`, say) comes through verbatim.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .filter_map(|(name, value)| {
                let placeholder = format!("{{{}}}", name);
                rest.find(&placeholder).map(|pos| (pos, placeholder.len(), *value))
            })
            .min_by_key(|(pos, _, _)| *pos);

        match next {
            Some((pos, len, value)) => {
                output.push_str(&rest[..pos]);
                output.push_str(value);
                rest = &rest[pos + len..];
            }
            None => {
                output.push_str(rest);
                return output;
            }
        }
    }
}

fn with_title(prompt: String, title: Option<&str>) -> String {
    match title {
        Some(title) if !title.is_empty() => format!("Paper Title: {}\n\n{}", title, prompt),
        _ => prompt,
    }
}

pub fn summary_prompt(text: &str, title: Option<&str>) -> String {
    with_title(fill(SUMMARY_TEMPLATE, &[("text", text)]), title)
}

pub fn combine_prompt(chunk_summaries: &[String]) -> String {
    let joined = chunk_summaries.join("\n\n");
    fill(COMBINE_TEMPLATE, &[("summaries", joined.as_str())])
}

pub fn refine_prompt(summary: &str, title: Option<&str>) -> String {
    with_title(fill(REFINE_TEMPLATE, &[("summary", summary)]), title)
}

pub fn analysis_prompt(formatted_summaries: &str) -> String {
    fill(ANALYSIS_TEMPLATE, &[("summaries", formatted_summaries)])
}

pub fn comparison_prompt(main_paper: &str, reference_insights: &str) -> String {
    fill(
        COMPARISON_TEMPLATE,
        &[("main_paper", main_paper), ("reference_insights", reference_insights)],
    )
}

pub fn final_report(analysis: &str, comparison: &str, generated_at: &str) -> String {
    fill(
        REPORT_TEMPLATE,
        &[
            ("generated_at", generated_at),
            ("analysis", analysis),
            ("comparison", comparison),
        ],
    )
}
