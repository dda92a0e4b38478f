use crate::lexicon::Lexicon;

/// Page furniture, transitions and title-page text that never reach the classifier.
pub fn is_junk_line(line: &str, lexicon: &Lexicon) -> bool {
    let clean = line.trim();
    if lexicon
        .whole_line_killers
        .iter()
        .any(|k| clean.contains(k.as_str()))
    {
        return true;
    }
    lexicon.dynamic_killers.iter().any(|re| re.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn junk(line: &str) -> bool {
        is_junk_line(line, &Lexicon::default())
    }

    #[test]
    fn transitions_and_act_breaks() {
        assert!(junk("                                        CUT TO:"));
        assert!(junk("                         END OF ACT ONE"));
        assert!(junk("FADE IN:"));
        assert!(junk("  DISSOLVE TO:"));
    }

    #[test]
    fn page_furniture() {
        assert!(junk("                                                        12."));
        assert!(junk("   27"));
        assert!(junk("A25"));
        assert!(junk("                                                  25B."));
        assert!(junk("   (CONTINUED)"));
        assert!(junk("Pink Revisions 03/14/13      34."));
        assert!(junk("© 2013 Some Studio"));
    }

    #[test]
    fn sound_effects_alone() {
        assert!(junk("          WHOOSH."));
        assert!(junk("BANG-BANG-BANG"));
        assert!(!junk("The door goes BANG and he jumps."));
    }

    #[test]
    fn story_lines_survive() {
        assert!(!junk("INT. WHITE HOUSE - DAY"));
        assert!(!junk("          Back to work, everyone."));
        assert!(!junk("Will stands in the doorway, dripping wet."));
        assert!(!junk("                         WILL"));
        assert!(!junk("                         R2-D2"));
        assert!(!junk("                         C3PO"));
        assert!(!junk("                  AB12 reporting in."));
    }

    #[test]
    fn extras_extend_killers() {
        let extras = crate::settings::LexiconExtras {
            whole_line_killers: vec!["Hannibal".into()],
            dynamic_killers: vec![r"^\s*Bryan Fuller".into()],
            ..Default::default()
        };
        let lex = Lexicon::new(&extras).unwrap();
        assert!(is_junk_line("HANNIBAL  Hannibal #303", &lex));
        assert!(is_junk_line("  bryan fuller", &lex));
    }
}
