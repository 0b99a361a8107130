//! Picks the featured image and the content images out of a production page.

use std::collections::HashSet;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::html::{ancestor_classes, decode_html, extract_srcset, scan_tags};
use crate::text::{kebab_case, truncate_kebab};

/// Heuristics for telling article images from page furniture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageRules {
    pub min_width: u32,
    pub featured_min_width: u32,
    /// Lowercase substrings of `src` that mark decorative images.
    pub exclude_patterns: Vec<String>,
    /// Substrings identifying the storage host article images live on.
    pub asset_hosts: Vec<String>,
    /// Images inside an element whose class contains one of these are skipped.
    pub excluded_ancestor_classes: Vec<String>,
    /// Extensions kept on upload; anything else becomes `default_extension`.
    pub extensions: Vec<String>,
    pub default_extension: String,
    pub max_name_len: usize,
}

impl Default for ImageRules {
    fn default() -> Self {
        Self {
            min_width: 200,
            featured_min_width: 800,
            exclude_patterns: [
                "twitter",
                "linkedin",
                "facebook",
                "social",
                "podcast-thumbnail",
                "trustpilot",
                "footer",
                "icon",
                "logo",
                "avatar",
            ]
            .map(String::from)
            .to_vec(),
            asset_hosts: ["bizee-website-assets", "s3.us-east"]
                .map(String::from)
                .to_vec(),
            excluded_ancestor_classes: ["related", "sidebar", "featured-articles"]
                .map(String::from)
                .to_vec(),
            extensions: ["jpg", "jpeg", "png", "gif", "webp", "svg"]
                .map(String::from)
                .to_vec(),
            default_extension: ".webp".to_string(),
            max_name_len: 50,
        }
    }
}

impl ImageRules {
    fn on_asset_host(&self, url: &str) -> bool {
        self.asset_hosts.iter().any(|host| url.contains(host.as_str()))
    }

    fn is_excluded(&self, src: &str) -> bool {
        let lower = src.to_ascii_lowercase();
        self.exclude_patterns
            .iter()
            .any(|pattern| lower.contains(pattern.as_str()))
    }

    fn in_excluded_container(&self, classes: &[String]) -> bool {
        classes.iter().any(|class| {
            self.excluded_ancestor_classes
                .iter()
                .any(|excluded| class.contains(excluded.as_str()))
        })
    }

    fn suggested_stem(&self, alt: &str, kind: &str, number: usize) -> String {
        let name = truncate_kebab(&kebab_case(alt), self.max_name_len);
        if name.is_empty() {
            format!("{kind}-image-{number}")
        } else {
            name
        }
    }

    /// Kebab-case file name from alt text, or `{kind}-image-{number}` without
    /// one, keeping the extension of `src`.
    pub fn suggested_name(&self, alt: &str, src: &str, kind: &str, number: usize) -> String {
        format!("{}{}", self.suggested_stem(alt, kind, number), self.extension_for(src))
    }

    /// `.ext` of the URL's file name when it is an allowed extension,
    /// otherwise `default_extension`.
    pub fn extension_for(&self, url: &str) -> String {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        file.rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .map_or_else(|| self.default_extension.clone(), |ext| format!(".{ext}"))
    }
}

/// Hands out file names, suffixing `-2`, `-3`, ... to a repeated stem.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn claim(&mut self, stem: &str, extension: &str) -> String {
        let mut name = format!("{stem}{extension}");
        let mut counter = 2;
        while !self.taken.insert(name.to_ascii_lowercase()) {
            name = format!("{stem}-{counter}{extension}");
            counter += 1;
        }
        name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    pub src: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub suggested_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageCounts {
    pub featured: usize,
    pub content: usize,
    pub total: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageReport {
    pub featured_image: Option<ImageEntry>,
    pub content_images: Vec<ImageEntry>,
    pub counts: ImageCounts,
}

impl ImageReport {
    /// Source URLs in upload order: featured first.
    pub fn urls(&self) -> Vec<String> {
        self.featured_image
            .iter()
            .chain(self.content_images.iter())
            .map(|image| image.src.clone())
            .collect()
    }
}

/// The first large image is featured; content images are the qualifying
/// images after it, numbered from zero. Suggested names are unique per page.
pub fn extract_images(html: &str, rules: &ImageRules) -> ImageReport {
    let mut report = ImageReport::default();
    let mut names = UniqueNames::default();

    for tag in scan_tags(html, "img") {
        let src = decode_html(tag.attr("src").unwrap_or_default());
        let alt = decode_html(tag.attr("alt").unwrap_or_default()).trim().to_string();
        let width = tag
            .attr("width")
            .and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|width| *width > 0);

        let Some(src) = qualifying_source(&src, tag.attr("srcset"), width, rules) else {
            report.counts.skipped += 1;
            continue;
        };
        if rules.in_excluded_container(&ancestor_classes(html, tag.start)) {
            log::debug!("skipping {src}: inside an excluded container");
            report.counts.skipped += 1;
            continue;
        }

        if report.featured_image.is_none() && width.is_some_and(|w| w >= rules.featured_min_width) {
            report.featured_image = Some(ImageEntry {
                suggested_name: names.claim(
                    &rules.suggested_stem(&alt, "featured", 1),
                    &rules.extension_for(&src),
                ),
                src,
                alt,
                position: None,
            });
            continue;
        }
        if report.featured_image.is_some() {
            let position = report.content_images.len();
            report.content_images.push(ImageEntry {
                suggested_name: names.claim(
                    &rules.suggested_stem(&alt, "content", position + 1),
                    &rules.extension_for(&src),
                ),
                src,
                alt,
                position: Some(position),
            });
        } else {
            report.counts.skipped += 1;
        }
    }

    report.counts.featured = usize::from(report.featured_image.is_some());
    report.counts.content = report.content_images.len();
    report.counts.total = report.counts.featured + report.counts.content;
    report
}

fn qualifying_source(
    src: &str,
    srcset: Option<&str>,
    width: Option<u32>,
    rules: &ImageRules,
) -> Option<String> {
    if width.is_some_and(|w| w < rules.min_width) || src.contains(".svg") || rules.is_excluded(src) {
        return None;
    }
    let mut source = src.to_string();
    if !rules.on_asset_host(src) {
        let srcset = decode_html(srcset.unwrap_or_default());
        if !rules.on_asset_host(&srcset) {
            return None;
        }
        if let Some(inner) = extract_srcset(&srcset).and_then(|first| unwrap_image_proxy(&first)) {
            source = inner;
        }
    }
    Some(unwrap_image_proxy(&source).unwrap_or(source))
}

/// The `url` query parameter of an image-optimizer URL such as
/// `/_next/image?url=...&w=1080`, percent-decoded.
pub fn unwrap_image_proxy(src: &str) -> Option<String> {
    if !src.contains("url=") {
        return None;
    }
    let base = Url::parse("https://proxy.invalid/").ok()?;
    let parsed = base.join(src).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const S3: &str = "https://bizee-website-assets.s3.us-east-2.amazonaws.com";

    fn page() -> String {
        format!(
            r#"<header><img src="{S3}/logo.png" width="300"></header>
<img src="{S3}/teaser.jpg" width="600" alt="Teaser">
<img src="{S3}/blog_top-image.jpg" width="1200" alt="Small Business Owners Planning Their LLC!">
<p><img src="/_next/image?url={S3_ENC}%2Fchart.png&amp;w=1080" srcset="/_next/image?url={S3_ENC}%2Fchart.png&amp;w=640 640w" width="700" alt=""></p>
<img src="https://cdn.example.com/stock.jpg" width="900" alt="Stock">
<img src="{S3}/tiny.jpg" width="120" alt="tiny">
<img src="{S3}/diagram.svg" width="900" alt="svg">
<div class="related-articles"><img src="{S3}/related.jpg" width="900" alt="Related"></div>
<img src="/_next/image?url=%2Flocal.png&amp;w=640" srcset="/_next/image?url={S3_ENC}%2Fsteps.png&amp;w=640 640w, /x 2x" width="800" alt="Steps to file">
"#,
            S3_ENC = "https%3A%2F%2Fbizee-website-assets.s3.us-east-2.amazonaws.com"
        )
    }

    #[test]
    fn first_large_image_is_featured_and_later_ones_are_content() {
        let report = extract_images(&page(), &ImageRules::default());
        let featured = report.featured_image.clone().expect("featured");
        assert_eq!(featured.src, format!("{S3}/blog_top-image.jpg"));
        assert_eq!(
            featured.suggested_name,
            "small-business-owners-planning-their-llc.jpg"
        );

        let content = report
            .content_images
            .iter()
            .map(|image| (image.src.as_str(), image.position, image.suggested_name.as_str()))
            .collect::<Vec<_>>();
        let chart = format!("{S3}/chart.png");
        let steps = format!("{S3}/steps.png");
        assert_eq!(
            content,
            vec![
                (chart.as_str(), Some(0), "content-image-1.png"),
                (steps.as_str(), Some(1), "steps-to-file.png"),
            ]
        );
        assert_eq!(
            (report.counts.featured, report.counts.content, report.counts.total),
            (1, 2, 3)
        );
        assert_eq!(report.urls().len(), 3);
    }

    #[test]
    fn rules_are_configurable() {
        let rules = ImageRules {
            featured_min_width: 1500,
            ..ImageRules::default()
        };
        let report = extract_images(&page(), &rules);
        assert_eq!(report.featured_image, None);
        assert!(report.content_images.is_empty());
    }

    #[test]
    fn suggested_names_cut_at_word_boundary() {
        let rules = ImageRules::default();
        let alt = "A very long alternative text describing the entire picture in detail";
        let name = rules.suggested_name(alt, "https://a.test/x.webp", "content", 3);
        assert_eq!(name, "a-very-long-alternative-text-describing-the.webp");
        assert_eq!(
            rules.suggested_name("  ", "https://a.test/raw", "featured", 1),
            "featured-image-1.webp"
        );
    }

    #[test]
    fn names_keep_source_extension_and_never_repeat() {
        let rules = ImageRules::default();
        assert_eq!(rules.extension_for("https://a.test/Photo.JPG?w=640"), ".jpg");
        assert_eq!(rules.extension_for("https://a.test/v1.2/image.bmp"), ".webp");
        assert_eq!(rules.extension_for("https://a.test/v1.2/image"), ".webp");

        let html = format!(
            r#"<img src="{S3}/hero.jpg" width="1200" alt="Hero">
<img src="{S3}/one.png" width="700" alt="Filing steps">
<img src="{S3}/two.png" width="700" alt="Filing steps">
<img src="{S3}/three.gif" width="700" alt="Filing steps">"#
        );
        let report = extract_images(&html, &rules);
        let names = report
            .content_images
            .iter()
            .map(|image| image.suggested_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["filing-steps.png", "filing-steps-2.png", "filing-steps.gif"]);
    }

    #[test]
    fn unwrap_image_proxy_decodes_url_parameter() {
        assert_eq!(
            unwrap_image_proxy("/_next/image?url=https%3A%2F%2Fa.test%2Fb.png&w=640").as_deref(),
            Some("https://a.test/b.png")
        );
        assert_eq!(unwrap_image_proxy("https://a.test/b.png"), None);
    }
}
