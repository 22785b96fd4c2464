const QUIZ_TEMPLATE: &str = "Generate a quiz for the request below, strictly in this format:
1. Exactly 5 questions.
2. An empty line after every question block.
3. After the question, 4 answer options, each on its own line.
4. The correct answer always comes first.
5. No explanations, only questions and answers.
6. At most 100 characters per line (questions and answers).
7. Questions and answers must be meaningful and logical.
8. Keep the format suitable for a Telegram quiz poll.

Example:
What is an asyndetic compound sentence?
Its parts are joined by intonation, without conjunctions.
A sentence with conjunctions between its parts.
A simple sentence with homogeneous members.
A sentence with subordinate clauses.

Which sentence uses correct punctuation?
The sun set, the forest fell silent, the stars lit up.
The sun set the forest fell silent the stars lit up.
The sun set: the forest fell silent the stars lit up.
The sun set the forest fell silent, the stars lit up.

(and 3 more questions in the same format).

No extra words, only the bare structure.";

/// Builds the single user message sent to the model for one quiz batch.
pub fn build_quiz_prompt(topic: &str) -> String {
    format!("{}\n\nRequest: {}", QUIZ_TEMPLATE, topic.trim())
}
