//! Fixed instruction prompts sent alongside the uploaded audio.
//!
//! The output shape of both prompts is what `normalize` expects back, so the
//! text is kept byte for byte, indentation and trailing spaces included.

/// Verbatim Spanish transcription, answered as `{text, segments}`.
pub const TRANSCRIPTION_PROMPT: &str = r#"
        ACT AS A PROFESSIONAL TRANSCRIBER. 
        TASK: Transcribe the audio verbatim. 
        LANGUAGE: Spanish (Español).
        OUTPUT FORMAT: JSON with "text" (full text) and "segments" (start, end, text).
        "#;

/// Structured Spanish summary, answered as `{summary, sections, keyPoints}`.
pub const SUMMARY_PROMPT: &str = r#"
        ACT AS AN EXPERT EDUCATIONAL VIDEO ANALYST.
        
        TASK: Create a structured summary of the provided video/audio.
        LANGUAGE: SPANISH (Español). ALL content (titles, text, key points) MUST be in Spanish.
        
        STRUCTURE REQUIREMENTS:
        1. "summary": A comprehensive executive summary in Spanish.
        2. "sections": Break down the video into logical sections.
           - "title": Concise section title in Spanish.
           - "start": EXACT timestamp in TOTAL SECONDS (float). 
             * EXAMPLE: "1 minute 30 seconds" -> 90.0 (NOT 1.30, NOT 1.5).
             * EXAMPLE: "5 minutes" -> 300.0 (NOT 5.0).
           - "content": Detailed explanation of the section in Spanish.
        3. "keyPoints": List of 3-5 key takeaways in Spanish.

        Output JSON format:
        {
            "summary": "Resumen ejecutivo completo...",
            "sections": [
                {"title": "Título de la Sección", "start": 0.0, "content": "Explicación detallada..."}
            ],
            "keyPoints": ["Punto clave 1", "Punto clave 2"]
        }
        "#;
