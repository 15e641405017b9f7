use crate::ast::petri::*;
use std::io::Write;
//writes a module as a PNML document to anything implementing write.
//The layout (indentation, line breaks, the FlowNetDSL toolspecific blocks) is
//what the downstream tools parse, so it must not change.

const NET_TYPE: &str = "http://www.pnml.org/version-2009/grammar/pnml";
const TOOL: &str = "FlowNetDSL";

//generated ids never need it, but module names come from the user
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

pub fn to_pnml(module: &PetriModule, mut dest: impl Write) -> Result<(), std::io::Error> {
    writeln!(dest, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(dest, "<pnml>")?;
    writeln!(
        dest,
        "  <net id=\"{}\" type=\"{}\">",
        escape(&module.name),
        NET_TYPE
    )?;
    for p in &module.places {
        let id = escape(&p.id);
        writeln!(dest, "    <place id=\"{}\">", id)?;
        writeln!(dest, "      <name><text>{}</text></name>", id)?;
        writeln!(dest, "      <initialMarking><text>0</text></initialMarking>")?;
        writeln!(dest, "    </place>")?;
    }
    for t in &module.transitions {
        let id = escape(&t.id);
        writeln!(dest, "    <transition id=\"{}\">", id)?;
        writeln!(dest, "      <name><text>{}</text></name>", id)?;
        if t.priority > 0 {
            writeln!(dest, "      <toolspecific tool=\"{}\">", TOOL)?;
            writeln!(dest, "        <priority>{}</priority>", t.priority)?;
            writeln!(dest, "      </toolspecific>")?;
        }
        writeln!(dest, "    </transition>")?;
    }
    //arc ids are only their position in the document
    for (i, a) in module.arcs.iter().enumerate() {
        writeln!(
            dest,
            "    <arc id=\"a{}\" source=\"{}\" target=\"{}\">",
            i,
            escape(&a.src),
            escape(&a.dst)
        )?;
        writeln!(dest, "      <toolspecific tool=\"{}\">", TOOL)?;
        writeln!(dest, "        <type>{}</type>", a.kind)?;
        writeln!(dest, "      </toolspecific>")?;
        writeln!(dest, "    </arc>")?;
    }
    writeln!(dest, "  </net>")?;
    writeln!(dest, "</pnml>")?;
    Ok(())
}

pub fn to_pnml_string(module: &PetriModule) -> Result<String, std::io::Error> {
    let mut buf = Vec::new();
    to_pnml(module, &mut buf)?;
    String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
