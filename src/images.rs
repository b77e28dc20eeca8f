//! Image references and the local placeholder graphic
//!
//! Images themselves live in an external object store keyed by the
//! brand+model slug. This module only builds keys/URLs and renders the
//! fallback SVG served when nothing is cached.

use unicode_normalization::UnicodeNormalization;

/// Slug for an image key: ASCII lowercase alphanumerics joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    // NFKD splits accented letters into base + combining mark; marks are non-ASCII
    for c in input.nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn image_slug(brand: &str, model: &str) -> String {
    slugify(&format!("{brand} {model}"))
}

/// Public reference for a car image, e.g. `/image/toyota-rav4`
pub fn image_ref(base_url: &str, brand: &str, model: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), image_slug(brand, model))
}

/// Object key inside the image bucket
pub fn object_key(slug: &str) -> String {
    format!("cars/{slug}.png")
}

fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turn a slug back into a readable label ("toyota-rav4" -> "Toyota Rav4")
pub fn label_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 640x360 placeholder with the car name centered
pub fn placeholder_svg(label: &str) -> String {
    let label = xml_escape(label);
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="360" viewBox="0 0 640 360">
<rect width="640" height="360" fill="#e5e7eb"/>
<path d="M170 230 l40 -60 h180 l60 60 z" fill="#9ca3af"/>
<rect x="150" y="228" width="340" height="40" rx="10" fill="#6b7280"/>
<circle cx="220" cy="270" r="22" fill="#374151"/>
<circle cx="420" cy="270" r="22" fill="#374151"/>
<text x="320" y="330" font-family="sans-serif" font-size="24" text-anchor="middle"
 fill="#111827">{label}</text>
</svg>"##
    )
}
