use crate::types::{QuizQuestion, ResultBundle};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

fn push_question(output: &mut String, number: usize, question: &QuizQuestion) {
    output.push_str(&format!("{}. {}\n", number, question.question));
    for (i, option) in question.options.iter().enumerate() {
        let letter = (b'A' + (i as u8 % 26)) as char;
        output.push_str(&format!("   {}. {}\n", letter, option));
    }
    output.push_str(&format!("\n   **Answer:** {}\n\n", question.correct_answer));
}

/// Render a result bundle as the markdown report document.
///
/// Sections always appear in the same order, even when empty.
pub fn format_markdown(bundle: &ResultBundle) -> String {
    let mut output = String::new();

    output.push_str("# Summary Report\n\n");

    // Transcript
    output.push_str("## Transcript\n\n");
    output.push_str(bundle.transcript.trim());
    output.push_str("\n\n");

    // Summaries
    let summaries = &bundle.summaries;
    output.push_str("## Summaries\n\n");
    output.push_str("### Short Summary\n\n");
    output.push_str(summaries.short.trim());
    output.push_str("\n\n");
    output.push_str("### Detailed Summary\n\n");
    output.push_str(summaries.detailed.trim());
    output.push_str("\n\n");
    output.push_str("### Key Points\n\n");
    for bullet in &summaries.bullets {
        output.push_str(&format!("- {}\n", bullet.trim()));
    }
    output.push('\n');

    // Chapters
    output.push_str("## Chapters\n\n");
    for chapter in &bundle.chapters {
        let start = format_timestamp(chapter.start_seconds);
        let end = format_timestamp(chapter.end_seconds);
        output.push_str(&format!("### {} ({} - {})\n\n", chapter.title, start, end));
        output.push_str(&format!("{}\n\n", chapter.content.trim()));
    }

    // Quiz
    output.push_str("## Quiz\n\n");
    output.push_str("### Multiple Choice Questions\n\n");
    for (i, question) in bundle.quiz.mcq.iter().enumerate() {
        push_question(&mut output, i + 1, question);
    }
    output.push_str("### True/False Questions\n\n");
    for (i, question) in bundle.quiz.true_false.iter().enumerate() {
        push_question(&mut output, i + 1, question);
    }

    // Sentiment
    output.push_str("## Sentiment Analysis\n\n");
    match &bundle.sentiment {
        Some(sentiment) => {
            output.push_str(&format!("- **Overall:** {}\n", sentiment.overall));
            output.push_str(&format!(
                "- **Confidence:** {:.1}%\n\n",
                sentiment.confidence * 100.0
            ));
            output.push_str("### Emotions\n\n");
            for (emotion, score) in &sentiment.emotions {
                output.push_str(&format!("- {}: {:.2}\n", emotion, score));
            }
            output.push('\n');
        }
        None => output.push_str("No sentiment analysis available.\n\n"),
    }

    output
}
