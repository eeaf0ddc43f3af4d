pub const README_GENERATION: &str = r#"
You are an experienced technical writer and software architect. Write a complete, professional README.md for the GitHub repository described below.

Repository Information:
{0}

The README must contain these sections:

## 1. Project Overview & Architecture
- A clear title and a description of what the project does, why it exists and who it is for
- A high-level architecture diagram as a Mermaid code block showing the main components, their relationships, the data flow between them and the technology stack
- Key features as a bullet list
- The technology stack, with versions where known (no badges)

## 2. Getting Started
- Prerequisites
- Step-by-step installation
- Configuration (environment variables, config files)
- A quick start with the minimal steps to get running
- Usage examples with code snippets (basic usage, common use cases, API or command-line examples where relevant)

## 3. Usage Guide
- Core functionality with examples
- Configuration options and what they mean
- API documentation for API projects, command reference for CLI tools
- Integration examples and a troubleshooting section

## 4. Development & Contribution
- Development environment setup
- Running and writing tests
- Code style and linting
- Git workflow, pull request process and issue reporting
- A reference to a code of conduct

Formatting:
- Valid markdown throughout, with a clear heading hierarchy
- Code blocks tagged with their language
- Tables for structured information and bullet points for scannability

Do NOT include any of the following:
- Badges of any kind (stars, forks, license, language, framework, version, release, CI/CD)
- Trust signals such as build status, coverage, dependency status or security badges
- Links to external badge services such as shields.io or libraries.io
- Social proof such as star, fork or contributor counts
- Analytics or other external service integrations that are not part of the project itself

Output ONLY the README.md content in markdown.
"#;

/// Wraps the assembled repository context in the README instructions
pub fn readme_prompt(context: &str) -> String {
    README_GENERATION.replace("{0}", context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_embedded_once() {
        let prompt = readme_prompt("Repository: widget");
        assert_eq!(prompt.matches("Repository: widget").count(), 1);
        assert!(!prompt.contains("{0}"));
    }

    #[test]
    fn test_prompt_names_sections_and_exclusions() {
        let prompt = readme_prompt("");
        assert!(prompt.contains("Mermaid"));
        assert!(prompt.contains("Getting Started"));
        assert!(prompt.contains("Badges of any kind"));
        assert!(prompt.contains("Analytics"));
    }
}
